//! Resource analyzer plugin interface.
//!
//! Analyzers inspect each resource's canonical inputs after the provider's
//! check has run. Their failures are advisory in form but terminal in
//! effect: any failure invalidates the resource and ends the plan.

use async_trait::async_trait;

use crate::resource::{PropertyMap, ResourceType};

use super::provider::ProviderError;

/// A single objection raised by an analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzeFailure {
    /// The property the objection concerns.
    pub property: String,
    /// Why the analyzer rejected the value.
    pub reason: String,
}

/// A resource analyzer plugin.
#[async_trait]
pub trait Analyzer: std::fmt::Debug + Send + Sync {
    /// Inspects a resource's canonical inputs.
    ///
    /// Returns one failure per objection; an empty list means the resource
    /// passed.
    async fn analyze(
        &self,
        ty: &ResourceType,
        inputs: &PropertyMap,
    ) -> Result<Vec<AnalyzeFailure>, ProviderError>;
}
