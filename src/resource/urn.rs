//! Resource identity tokens.
//!
//! Every managed resource is addressed by a URN derived deterministically
//! from its target, source package, type, and name. URNs are the planner's
//! primary key: they tie registration events to prior snapshot entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// URN prefix shared by all Halldyll resources.
const URN_PREFIX: &str = "urn:halldyll:";

/// Separator between URN components.
const URN_SEPARATOR: &str = "::";

/// A stable, globally unique identifier for a managed resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    /// Builds the URN for a resource from its identifying components.
    ///
    /// The construction is deterministic: the same components always yield
    /// the same URN, across runs and across processes.
    #[must_use]
    pub fn new(target: &str, package: &str, ty: &ResourceType, name: &str) -> Self {
        Self(format!(
            "{URN_PREFIX}{target}{URN_SEPARATOR}{package}{URN_SEPARATOR}{ty}{URN_SEPARATOR}{name}"
        ))
    }

    /// Returns the resource name component (the trailing segment).
    #[must_use]
    pub fn name(&self) -> &str {
        self.0
            .rsplit(URN_SEPARATOR)
            .next()
            .unwrap_or(self.0.as_str())
    }

    /// Returns the URN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resource type token of the form `package:module:Type`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    /// Creates a resource type token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the package component (everything before the first `:`).
    #[must_use]
    pub fn package(&self) -> &str {
        self.0.split(':').next().unwrap_or(self.0.as_str())
    }

    /// Returns the full token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}
