//! Deployment plans.
//!
//! A plan binds a target, its previous snapshot, a desired-state source, and
//! the plugin host together. Starting a plan configures every provider the
//! target carries config for, then hands back an iterator that walks the
//! plan's steps one at a time.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::diag::{DiagnosticSink, TracingSink};
use crate::error::{ConfigError, EngineError, Result};
use crate::plugin::{Host, ProviderRegistry, ResourceStatus};
use crate::resource::{StateCell, Urn};
use crate::snapshot::Snapshot;
use crate::source::Source;
use crate::target::Target;

use super::iterator::PlanIterator;
use super::step::Step;

/// Opaque value threaded from the pre-step hook to the post-step hook.
pub type EventContext = Box<dyn Any + Send>;

/// Callbacks raised at interesting points of a plan's execution.
///
/// Each hook may abort the plan by returning an error. These hooks are the
/// only synchronization point exposed to callers: every effect on iterator
/// state happens before the post-step hook runs.
pub trait PlanEvents: fmt::Debug + Send + Sync {
    /// Raised before a step is applied; the returned context is handed back
    /// to the post-step hook.
    ///
    /// # Errors
    ///
    /// An error aborts the plan before the step runs.
    fn on_resource_step_pre(&self, step: &Step) -> Result<EventContext>;

    /// Raised after a step is applied, whether or not it succeeded.
    ///
    /// # Errors
    ///
    /// An error aborts the plan; it wraps the step's own outcome without
    /// masking its status.
    fn on_resource_step_post(
        &self,
        context: EventContext,
        step: &Step,
        status: ResourceStatus,
        error: Option<&EngineError>,
    ) -> Result<()>;

    /// Raised when a registration's output completion has been recorded.
    ///
    /// # Errors
    ///
    /// An error aborts the plan.
    fn on_resource_outputs(&self, step: &Step) -> Result<()>;
}

/// Options controlling the planning and deployment process.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Degree of parallelism for downstream step execution; `<= 1` is
    /// serial. Advisory only: sequential semantics are authoritative.
    pub parallel: usize,
    /// Optional event hooks.
    pub events: Option<Arc<dyn PlanEvents>>,
}

impl Options {
    /// Returns true if step execution must be serial.
    #[must_use]
    pub const fn is_serial(&self) -> bool {
        self.parallel <= 1
    }

    /// Attaches event hooks to these options.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn PlanEvents>) -> Self {
        self.events = Some(events);
        self
    }
}

/// A deployment plan: the reconciliation of a source's desired state with a
/// target's previous snapshot.
#[derive(Debug)]
pub struct Plan {
    /// The plugin host providers and analyzers are loaded from.
    host: Arc<dyn Host>,
    /// The target being deployed to.
    target: Target,
    /// The previous snapshot, if one was recorded.
    prev: Option<Snapshot>,
    /// Prior states by URN, excluding pending-delete entries.
    olds: HashMap<Urn, StateCell>,
    /// The desired-state event source.
    source: Box<dyn Source>,
    /// Names of analyzers every resource must pass.
    analyzers: Vec<String>,
    /// Sink for user-facing validation diagnostics.
    diag: Arc<dyn DiagnosticSink>,
    /// Per-package provider cache.
    providers: ProviderRegistry,
}

impl Plan {
    /// Creates a new plan.
    #[must_use]
    pub fn new(
        host: Arc<dyn Host>,
        target: Target,
        prev: Option<Snapshot>,
        source: Box<dyn Source>,
    ) -> Self {
        let olds = prev.as_ref().map(build_olds).unwrap_or_default();
        Self {
            providers: ProviderRegistry::new(host.clone()),
            host,
            target,
            prev,
            olds,
            source,
            analyzers: Vec::new(),
            diag: Arc::new(TracingSink),
        }
    }

    /// Sets the analyzers every resource must pass.
    #[must_use]
    pub fn with_analyzers(mut self, analyzers: Vec<String>) -> Self {
        self.analyzers = analyzers;
        self
    }

    /// Sets the diagnostic sink.
    #[must_use]
    pub fn with_diag(mut self, diag: Arc<dyn DiagnosticSink>) -> Self {
        self.diag = diag;
        self
    }

    /// Starts the plan and returns an iterator over its steps.
    ///
    /// Providers named by the target's configuration are configured first,
    /// exactly once each, in sorted package order.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the source cannot begin
    /// iterating.
    pub async fn start(&self, opts: Options) -> Result<PlanIterator<'_>> {
        self.configure().await?;
        let src = self.source.iterate(&opts).await?;
        Ok(PlanIterator::new(self, opts, src))
    }

    /// Groups target config by package and configures each provider once.
    async fn configure(&self) -> Result<()> {
        let mut pkgconfigs: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for (key, value) in &self.target.config {
            let plaintext = value.value(self.target.decrypter.as_ref()).map_err(|e| {
                ConfigError::DecryptFailed {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;
            pkgconfigs
                .entry(key.package().to_string())
                .or_default()
                .insert(key.to_string(), plaintext);
        }

        // BTreeMap iteration is sorted by package, so the configure order
        // and the error surface are reproducible across runs.
        for (package, config) in &pkgconfigs {
            match self.providers.provider(package)? {
                Some(provider) => {
                    debug!("Configuring provider for package '{package}'");
                    provider.configure(config).await.map_err(|e| {
                        ConfigError::ConfigureFailed {
                            package: package.clone(),
                            message: e.to_string(),
                        }
                    })?;
                }
                // A package may carry config without a provider; the values
                // then only affect program-level logic.
                None => debug!("No provider to configure for package '{package}'"),
            }
        }
        Ok(())
    }

    /// Returns the target this plan deploys to.
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// Returns the previous snapshot, if one was recorded.
    #[must_use]
    pub const fn prev(&self) -> Option<&Snapshot> {
        self.prev.as_ref()
    }

    /// Looks up a prior resource state by URN.
    #[must_use]
    pub fn old(&self, urn: &Urn) -> Option<&StateCell> {
        self.olds.get(urn)
    }

    /// Returns the analyzers every resource must pass.
    #[must_use]
    pub fn analyzers(&self) -> &[String] {
        &self.analyzers
    }

    /// Returns the diagnostic sink.
    #[must_use]
    pub fn diag(&self) -> &dyn DiagnosticSink {
        self.diag.as_ref()
    }

    /// Returns the plugin host.
    #[must_use]
    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    /// Returns the per-package provider cache.
    #[must_use]
    pub const fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Returns the package the source's program belongs to.
    #[must_use]
    pub fn source_package(&self) -> &str {
        self.source.package()
    }
}

/// Builds the URN lookup map for a previous snapshot.
///
/// Pending-delete entries are excluded: they are not updatable old state,
/// and a snapshot may hold both a live and a pending-delete record for the
/// same URN.
fn build_olds(prev: &Snapshot) -> HashMap<Urn, StateCell> {
    let mut olds = HashMap::new();
    for res in &prev.resources {
        let state = res.read();
        if state.delete {
            continue;
        }
        olds.entry(state.urn.clone()).or_insert_with(|| res.clone());
    }
    olds
}
