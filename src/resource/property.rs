//! Resource property values and maps.
//!
//! Inputs and outputs of a resource are ordered maps from property names to
//! tagged values. The planner compares them with [`PropertyMap::deep_equals`]
//! to decide whether a registration is a no-op, an update, or a replacement.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single tagged property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    /// The absence of a value.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// A numeric scalar.
    Number(f64),
    /// A string scalar.
    String(String),
    /// An ordered list of values.
    Array(Vec<PropertyValue>),
    /// A nested property map.
    Object(PropertyMap),
    /// A blob of data addressed by content.
    Asset(Asset),
    /// A value whose plaintext must not be persisted unwrapped.
    Secret(Box<PropertyValue>),
    /// A placeholder for a value only known after the provider runs.
    Computed,
}

/// A blob of data attached to a resource property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    /// Literal text content.
    Text(String),
    /// A path on the local filesystem.
    Path(String),
    /// A remote location.
    Uri(String),
}

impl PropertyValue {
    /// Wraps a value as a secret.
    #[must_use]
    pub fn secret(value: PropertyValue) -> Self {
        Self::Secret(Box::new(value))
    }

    /// Returns true if this value is a computed placeholder.
    #[must_use]
    pub const fn is_computed(&self) -> bool {
        matches!(self, Self::Computed)
    }

    /// Compares two values for semantic equality.
    ///
    /// Two policies distinguish this from structural equality:
    ///
    /// - a [`PropertyValue::Computed`] placeholder equals anything, since its
    ///   concrete value is unknowable until the provider runs;
    /// - [`PropertyValue::Secret`] wrapping is transparent: a secret equals a
    ///   plain value with the same underlying value. Secretness governs how a
    ///   value is persisted, not what it is.
    #[must_use]
    pub fn deep_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Computed, _) | (_, Self::Computed) => true,
            (Self::Secret(inner), other) | (other, Self::Secret(inner)) => {
                inner.deep_equals(other)
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.deep_equals(y))
            }
            (Self::Object(a), Self::Object(b)) => a.deep_equals(b),
            (a, b) => a == b,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for PropertyValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// An ordered mapping from property names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap(BTreeMap<String, PropertyValue>);

impl PropertyMap {
    /// Creates an empty property map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value for a property, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Sets a property, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        self.0.insert(key.into(), value)
    }

    /// Returns true if the map holds no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    /// Merges another map into this one.
    ///
    /// Incoming keys override existing keys of the same name; keys absent
    /// from `other` are left untouched.
    pub fn merge(&mut self, other: PropertyMap) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Compares two maps for semantic equality.
    ///
    /// Key sets must match exactly; values are compared with
    /// [`PropertyValue::deep_equals`], so computed placeholders and secret
    /// wrapping follow the policies documented there.
    #[must_use]
    pub fn deep_equals(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().all(|(key, value)| {
                other.0.get(key).is_some_and(|o| value.deep_equals(o))
            })
    }
}

impl<K: Into<String>> FromIterator<(K, PropertyValue)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (K, PropertyValue)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_deep_equals_structural() {
        let a = map(&[("k", 1.into()), ("s", "v".into())]);
        let b = map(&[("k", 1.into()), ("s", "v".into())]);
        let c = map(&[("k", 2.into()), ("s", "v".into())]);

        assert!(a.deep_equals(&b));
        assert!(!a.deep_equals(&c));
    }

    #[test]
    fn test_deep_equals_key_sets_must_match() {
        let a = map(&[("k", 1.into())]);
        let b = map(&[("k", 1.into()), ("extra", 2.into())]);

        assert!(!a.deep_equals(&b));
        assert!(!b.deep_equals(&a));
    }

    #[test]
    fn test_computed_equals_anything() {
        let a = map(&[("k", PropertyValue::Computed)]);
        let b = map(&[("k", "anything".into())]);

        assert!(a.deep_equals(&b));
        assert!(b.deep_equals(&a));
    }

    #[test]
    fn test_secret_wrapping_is_transparent() {
        let a = map(&[("k", PropertyValue::secret("v".into()))]);
        let b = map(&[("k", "v".into())]);
        let c = map(&[("k", "other".into())]);

        assert!(a.deep_equals(&b));
        assert!(b.deep_equals(&a));
        assert!(!a.deep_equals(&c));
    }

    #[test]
    fn test_nested_values() {
        let a = map(&[(
            "obj",
            PropertyValue::Object(map(&[("inner", PropertyValue::Array(vec![1.into()]))])),
        )]);
        let b = map(&[(
            "obj",
            PropertyValue::Object(map(&[("inner", PropertyValue::Array(vec![1.into()]))])),
        )]);
        let c = map(&[(
            "obj",
            PropertyValue::Object(map(&[("inner", PropertyValue::Array(vec![2.into()]))])),
        )]);

        assert!(a.deep_equals(&b));
        assert!(!a.deep_equals(&c));
    }

    #[test]
    fn test_merge_overrides() {
        let mut a = map(&[("keep", 1.into()), ("replace", 2.into())]);
        a.merge(map(&[("replace", 3.into()), ("added", 4.into())]));

        assert_eq!(a.get("keep"), Some(&PropertyValue::Number(1.0)));
        assert_eq!(a.get("replace"), Some(&PropertyValue::Number(3.0)));
        assert_eq!(a.get("added"), Some(&PropertyValue::Number(4.0)));
    }
}
