//! Error types for the Halldyll planning engine.
//!
//! This module provides the error hierarchy for all planning operations:
//! target configuration, plugin loading, plan validation, step application,
//! and the source event stream. Contract violations (programmer errors) are
//! not represented here; those panic.

use thiserror::Error;

use crate::planner::StepOp;
use crate::plugin::ResourceStatus;
use crate::resource::Urn;

/// The main error type for the Halldyll planning engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Target configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plugin loading and lookup errors.
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// Plan validation and decision errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Step application errors.
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    /// Source event stream errors.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Target configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config value could not be decrypted.
    #[error("Failed to decrypt config value '{key}': {message}")]
    DecryptFailed {
        /// The config key whose value failed to decrypt.
        key: String,
        /// Description of the decryption failure.
        message: String,
    },

    /// A provider rejected its configuration.
    #[error("Failed to configure provider for package '{package}': {message}")]
    ConfigureFailed {
        /// Package whose provider rejected the configuration.
        package: String,
        /// Description of the configuration failure.
        message: String,
    },
}

/// Plugin loading and lookup errors.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No provider plugin is available for a custom resource's package.
    #[error("No resource provider found for package '{package}'")]
    ProviderNotFound {
        /// Package with no provider on the plugin search path.
        package: String,
    },

    /// A configured analyzer is not available.
    #[error("Analyzer '{name}' could not be loaded from the plugin search path")]
    AnalyzerNotFound {
        /// Name of the missing analyzer.
        name: String,
    },

    /// The host failed while loading a plugin.
    #[error("Failed to load plugin '{plugin}': {message}")]
    LoadFailed {
        /// The plugin that failed to load.
        plugin: String,
        /// Description of the load failure.
        message: String,
    },
}

/// Plan validation and decision errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// One or more resources failed validation.
    #[error("Resource '{urn}' failed validation; refusing to proceed")]
    ResourceInvalid {
        /// URN of the invalid resource.
        urn: Urn,
    },

    /// A logical step for a URN was applied more than once.
    #[error("Resource '{urn}' registered twice")]
    DuplicateRegistration {
        /// URN registered twice.
        urn: Urn,
    },

    /// The provider's check call failed.
    #[error("Check of '{urn}' failed: {message}")]
    Check {
        /// URN being checked.
        urn: Urn,
        /// Description of the failure.
        message: String,
    },

    /// The provider's diff call failed.
    #[error("Diff of '{urn}' failed: {message}")]
    Diff {
        /// URN being diffed.
        urn: Urn,
        /// Description of the failure.
        message: String,
    },

    /// An analyzer failed while inspecting a resource.
    #[error("Analyzer '{analyzer}' failed on '{urn}': {message}")]
    Analyze {
        /// The analyzer that failed.
        analyzer: String,
        /// URN being analyzed.
        urn: Urn,
        /// Description of the failure.
        message: String,
    },
}

/// Step application errors.
///
/// Variants raised after a step has run carry the resource status observed
/// at the failure point, so callers can record partial progress; hook errors
/// wrap the step outcome without masking that status.
#[derive(Debug, Error)]
pub enum StepError {
    /// The step's provider operation failed.
    #[error("{op} of '{urn}' failed: {message}")]
    Apply {
        /// The operation that failed.
        op: StepOp,
        /// URN the step targets.
        urn: Urn,
        /// Resource status at the failure point.
        status: ResourceStatus,
        /// Description of the failure.
        message: String,
    },

    /// The pre-step event hook returned an error.
    #[error("Pre-step event returned an error: {message}")]
    PreStepHook {
        /// Description of the hook failure.
        message: String,
    },

    /// The post-step event hook returned an error.
    #[error("Post-step event returned an error: {message}")]
    PostStepHook {
        /// Resource status of the step the hook observed.
        status: ResourceStatus,
        /// Description of the hook failure.
        message: String,
    },

    /// The resource outputs event hook returned an error.
    #[error("Resource outputs event for '{urn}' returned an error: {message}")]
    OutputsHook {
        /// URN whose outputs completed.
        urn: Urn,
        /// Description of the hook failure.
        message: String,
    },
}

/// Source event stream errors.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SourceError {
    /// Description of the source failure.
    pub message: String,
}

impl SourceError {
    /// Creates a new source error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type alias for planning engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the resource status embedded in this error.
    ///
    /// Errors raised before any resource effect report
    /// [`ResourceStatus::Ok`].
    #[must_use]
    pub const fn status(&self) -> ResourceStatus {
        match self {
            Self::Step(
                StepError::Apply { status, .. } | StepError::PostStepHook { status, .. },
            ) => *status,
            _ => ResourceStatus::Ok,
        }
    }
}
