//! Resource state records.
//!
//! These types represent the recorded state of managed resources: the goal a
//! program registered, the state the planner builds up as steps execute, and
//! the shared handle through which steps and snapshots observe that state.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::property::PropertyMap;
use super::urn::{ResourceType, Urn};

/// The desired state carried by a resource registration.
#[derive(Debug, Clone)]
pub struct ResourceGoal {
    /// Resource type token.
    pub ty: ResourceType,
    /// Resource name, unique within its type for a target.
    pub name: String,
    /// Whether the resource is backed by a provider plugin.
    pub custom: bool,
    /// Desired input properties.
    pub properties: PropertyMap,
    /// URN of the parent resource, if any.
    pub parent: Option<Urn>,
}

impl ResourceGoal {
    /// Creates a new resource goal.
    #[must_use]
    pub fn new(
        ty: ResourceType,
        name: impl Into<String>,
        custom: bool,
        properties: PropertyMap,
        parent: Option<Urn>,
    ) -> Self {
        Self {
            ty,
            name: name.into(),
            custom,
            properties,
            parent,
        }
    }
}

/// The recorded state of a single managed resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type token.
    #[serde(rename = "type")]
    pub ty: ResourceType,
    /// The resource's URN.
    pub urn: Urn,
    /// Whether the resource is backed by a provider plugin.
    pub custom: bool,
    /// Provider-assigned identifier; empty until the resource is created.
    #[serde(default)]
    pub id: String,
    /// Canonical input properties, as returned by the provider's check.
    pub inputs: PropertyMap,
    /// Output properties assigned by the provider and later completions.
    #[serde(default)]
    pub outputs: PropertyMap,
    /// URN of the parent resource, if any.
    #[serde(default)]
    pub parent: Option<Urn>,
    /// True if the resource is pending deletion by a later run.
    #[serde(default)]
    pub delete: bool,
}

impl ResourceState {
    /// Creates a fresh state record with empty outputs and no identifier.
    #[must_use]
    pub const fn new(
        ty: ResourceType,
        urn: Urn,
        custom: bool,
        inputs: PropertyMap,
        parent: Option<Urn>,
    ) -> Self {
        Self {
            ty,
            urn,
            custom,
            id: String::new(),
            inputs,
            outputs: PropertyMap::new(),
            parent,
            delete: false,
        }
    }

    /// Merges additional output properties into this state.
    ///
    /// Incoming keys override outputs of the same name; everything else is
    /// preserved.
    pub fn add_outputs(&mut self, outputs: PropertyMap) {
        self.outputs.merge(outputs);
    }
}

/// A shared, mutable handle to a resource state record.
///
/// Steps and the plan iterator observe the same underlying record: output
/// completions and provider results written through one handle are visible
/// to every other holder, including snapshots taken afterwards.
#[derive(Debug, Clone)]
pub struct StateCell(Arc<RwLock<ResourceState>>);

impl StateCell {
    /// Wraps a state record in a shared handle.
    #[must_use]
    pub fn new(state: ResourceState) -> Self {
        Self(Arc::new(RwLock::new(state)))
    }

    /// Acquires read access to the underlying record.
    #[must_use]
    pub fn read(&self) -> RwLockReadGuard<'_, ResourceState> {
        self.0.read().expect("resource state lock poisoned")
    }

    /// Acquires write access to the underlying record.
    #[must_use]
    pub fn write(&self) -> RwLockWriteGuard<'_, ResourceState> {
        self.0.write().expect("resource state lock poisoned")
    }

    /// Returns true if both handles refer to the same record.
    #[must_use]
    pub fn same_cell(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns a key identifying the underlying record, not its contents.
    ///
    /// Two prior-snapshot entries may legally share a URN (a live record and
    /// a pending-delete one); bookkeeping that must distinguish them is
    /// keyed by cell identity.
    #[must_use]
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl Serialize for StateCell {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StateCell {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ResourceState::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::property::PropertyValue;

    fn create_test_state() -> ResourceState {
        let ty = ResourceType::new("test:index:Widget");
        let urn = Urn::new("dev", "app", &ty, "w");
        ResourceState::new(
            ty,
            urn,
            true,
            [("k", PropertyValue::from(1))].into_iter().collect(),
            None,
        )
    }

    #[test]
    fn test_new_state_is_blank() {
        let state = create_test_state();

        assert!(state.id.is_empty());
        assert!(state.outputs.is_empty());
        assert!(!state.delete);
    }

    #[test]
    fn test_add_outputs_overrides() {
        let mut state = create_test_state();
        state.add_outputs([("a", PropertyValue::from(1))].into_iter().collect());
        state.add_outputs(
            [("a", PropertyValue::from(2)), ("b", PropertyValue::from(3))]
                .into_iter()
                .collect(),
        );

        assert_eq!(state.outputs.get("a"), Some(&PropertyValue::Number(2.0)));
        assert_eq!(state.outputs.get("b"), Some(&PropertyValue::Number(3.0)));
    }

    #[test]
    fn test_cell_shares_mutations() {
        let cell = StateCell::new(create_test_state());
        let alias = cell.clone();

        cell.write().id = String::from("assigned");

        assert_eq!(alias.read().id, "assigned");
        assert!(cell.same_cell(&alias));
    }

    #[test]
    fn test_cell_serde_round_trip() {
        let cell = StateCell::new(create_test_state());
        let json = serde_json::to_string(&cell).expect("serialize failed");
        let back: StateCell = serde_json::from_str(&json).expect("deserialize failed");

        assert_eq!(back.read().urn, cell.read().urn);
        assert_eq!(back.read().inputs, cell.read().inputs);
        assert!(!back.same_cell(&cell));
    }
}
