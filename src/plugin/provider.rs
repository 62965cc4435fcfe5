//! Resource provider plugin interface.
//!
//! Providers give custom resources their real-world effects: validating
//! inputs, assessing the impact of changes, and performing the create,
//! update, and delete operations a plan decides on. Logical resources never
//! touch a provider.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::resource::{PropertyMap, Urn};

/// The condition of a resource after a provider operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    /// The operation reached its goal state.
    Ok,
    /// The resource was modified but did not reach its goal state.
    PartialFailure,
    /// The resource's condition after the operation is not known.
    UnknownFailure,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::PartialFailure => "partial failure",
            Self::UnknownFailure => "unknown failure",
        };
        write!(f, "{s}")
    }
}

/// Error returned by provider operations.
///
/// The variant encodes what happened to the resource, so callers know
/// whether partial progress must be recorded.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The operation failed without modifying the resource.
    #[error("{message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },

    /// The operation modified the resource but fell short of the goal state.
    #[error("{message}")]
    Partial {
        /// Description of the failure.
        message: String,
        /// Identifier assigned before the failure, if the resource now exists.
        id: Option<String>,
        /// Outputs produced before the failure, if any.
        outputs: Option<PropertyMap>,
    },

    /// The operation failed and the resource's condition is unknowable.
    #[error("{message}")]
    Unknown {
        /// Description of the failure.
        message: String,
    },
}

impl ProviderError {
    /// Creates a failure that left the resource untouched.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates a failure that left the resource's condition unknown.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Returns the resource status this error implies.
    #[must_use]
    pub const fn status(&self) -> ResourceStatus {
        match self {
            Self::Failed { .. } => ResourceStatus::Ok,
            Self::Partial { .. } => ResourceStatus::PartialFailure,
            Self::Unknown { .. } => ResourceStatus::UnknownFailure,
        }
    }
}

/// A single input validation failure reported by a provider's check.
#[derive(Debug, Clone)]
pub struct CheckFailure {
    /// The offending property, or `None` for a resource-wide failure.
    pub property: Option<String>,
    /// Why the input was rejected.
    pub reason: String,
}

/// Result of a provider's check: canonical inputs plus any failures.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Canonical input properties, with provider defaults applied.
    pub inputs: PropertyMap,
    /// Validation failures; empty when the inputs are acceptable.
    pub failures: Vec<CheckFailure>,
}

impl CheckResult {
    /// Creates a passing check result with the given canonical inputs.
    #[must_use]
    pub const fn passed(inputs: PropertyMap) -> Self {
        Self {
            inputs,
            failures: Vec::new(),
        }
    }
}

/// The provider's overall assessment of an input change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeKind {
    /// The provider did not assess the change.
    #[default]
    Unknown,
    /// No meaningful change.
    None,
    /// The inputs changed in a way the provider recognizes.
    Some,
}

/// Result of a provider's diff between old and new inputs.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    /// True if the change cannot be applied in place.
    pub replace: bool,
    /// Input keys forcing the replacement.
    pub replace_keys: Vec<String>,
    /// Input keys guaranteed not to change during an in-place update.
    pub stable_keys: Vec<String>,
    /// The provider's overall assessment of the change.
    pub changes: ChangeKind,
}

impl DiffResult {
    /// Creates a diff that forces replacement, keyed by the given inputs.
    #[must_use]
    pub fn replacement(replace_keys: Vec<String>) -> Self {
        Self {
            replace: true,
            replace_keys,
            stable_keys: Vec::new(),
            changes: ChangeKind::Some,
        }
    }

    /// Creates a diff that permits an in-place update.
    #[must_use]
    pub fn changes(stable_keys: Vec<String>) -> Self {
        Self {
            replace: false,
            replace_keys: Vec::new(),
            stable_keys,
            changes: ChangeKind::Some,
        }
    }
}

/// Result of a successful provider create.
#[derive(Debug, Clone)]
pub struct CreateResult {
    /// Provider-assigned identifier; must not be empty.
    pub id: String,
    /// Output properties observed at creation.
    pub outputs: PropertyMap,
}

/// A resource provider plugin for a single package.
///
/// Providers may block on network I/O; the planner awaits them one at a
/// time. `configure` is called at most once per plan, before any other
/// operation; providers may treat a second call as a contract violation.
#[async_trait]
pub trait Provider: std::fmt::Debug + Send + Sync {
    /// Applies the target's package configuration to this provider.
    async fn configure(&self, config: &BTreeMap<String, String>) -> Result<(), ProviderError>;

    /// Validates inputs and returns their canonical form.
    ///
    /// `olds` carries the prior inputs when the resource already exists, so
    /// the provider can carry defaults forward.
    async fn check(
        &self,
        urn: &Urn,
        olds: Option<&PropertyMap>,
        news: &PropertyMap,
    ) -> Result<CheckResult, ProviderError>;

    /// Assesses whether an input change is an update or a replacement.
    async fn diff(
        &self,
        urn: &Urn,
        id: &str,
        olds: &PropertyMap,
        news: &PropertyMap,
    ) -> Result<DiffResult, ProviderError>;

    /// Creates a resource from canonical inputs.
    async fn create(&self, urn: &Urn, inputs: &PropertyMap) -> Result<CreateResult, ProviderError>;

    /// Updates an existing resource in place, returning its new outputs.
    async fn update(
        &self,
        urn: &Urn,
        id: &str,
        olds: &PropertyMap,
        news: &PropertyMap,
        stable_keys: &[String],
    ) -> Result<PropertyMap, ProviderError>;

    /// Deletes an existing resource.
    async fn delete(&self, urn: &Urn, id: &str, inputs: &PropertyMap)
        -> Result<(), ProviderError>;
}
