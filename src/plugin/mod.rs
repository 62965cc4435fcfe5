//! Plugin interfaces for the planning engine.
//!
//! Providers, analyzers, and the host that loads them are external
//! collaborators; this module defines the contracts the planner holds them
//! to, plus the per-plan provider lookup cache.

mod analyzer;
mod host;
mod provider;
mod registry;

pub use analyzer::{AnalyzeFailure, Analyzer};
pub use host::{Host, PluginInfo, PluginKind};
pub use provider::{
    ChangeKind, CheckFailure, CheckResult, CreateResult, DiffResult, Provider, ProviderError,
    ResourceStatus,
};
pub use registry::ProviderRegistry;
