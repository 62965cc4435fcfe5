//! Shared fixtures for planner tests.
//!
//! Deterministic in-memory stand-ins for the external collaborators: a
//! scriptable provider and host, a replayed event source, and recording
//! sinks for diagnostics and event hooks.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::diag::DiagnosticSink;
use crate::error::{EngineError, PluginError, Result as EngineResult};
use crate::plugin::{
    AnalyzeFailure, Analyzer, CheckFailure, CheckResult, CreateResult, DiffResult, Host,
    PluginInfo, Provider, ProviderError, ResourceStatus,
};
use crate::resource::{
    PropertyMap, PropertyValue, ResourceGoal, ResourceState, ResourceType, StateCell, Urn,
};
use crate::snapshot::{ENGINE_VERSION, Manifest, Snapshot};
use crate::source::{
    RegisterResourceEvent, RegisterResourceOutputsEvent, Source, SourceEvent, SourceIterator,
};
use crate::target::Target;

use super::iterator::PlanIterator;
use super::plan::{EventContext, Options, Plan, PlanEvents};
use super::step::{Step, StepOp};

/// Target name used by every fixture.
pub(crate) const TARGET: &str = "dev";

/// Source package used by every fixture.
pub(crate) const PACKAGE: &str = "test";

/// Resource type used by every fixture; its package is [`PACKAGE`].
pub(crate) const RES_TYPE: &str = "test:index:Res";

/// Builds a property map from literal pairs.
pub(crate) fn pm(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
    pairs.iter().cloned().collect()
}

/// Returns the URN a fixture resource with this name will get.
pub(crate) fn test_urn(name: &str) -> Urn {
    Urn::new(TARGET, PACKAGE, &ResourceType::new(RES_TYPE), name)
}

/// Builds a goal for a provider-backed resource.
pub(crate) fn custom_goal(name: &str, properties: PropertyMap) -> ResourceGoal {
    ResourceGoal::new(ResourceType::new(RES_TYPE), name, true, properties, None)
}

/// Builds a goal for a logical (provider-less) resource.
pub(crate) fn logical_goal(name: &str, properties: PropertyMap) -> ResourceGoal {
    ResourceGoal::new(ResourceType::new(RES_TYPE), name, false, properties, None)
}

/// Builds a prior-snapshot state for a provider-backed resource.
pub(crate) fn prior_state(name: &str, id: &str, inputs: PropertyMap) -> StateCell {
    let ty = ResourceType::new(RES_TYPE);
    let urn = Urn::new(TARGET, PACKAGE, &ty, name);
    let mut state = ResourceState::new(ty, urn, true, inputs, None);
    state.id = id.to_string();
    StateCell::new(state)
}

/// Wraps prior states into a snapshot for [`TARGET`].
pub(crate) fn prior_snapshot(resources: Vec<StateCell>) -> Snapshot {
    Snapshot::new(
        TARGET.to_string(),
        Manifest::new(Utc::now(), ENGINE_VERSION, vec![]),
        resources,
    )
}

/// A scriptable in-memory provider.
///
/// Behavior is configured through the public fields before the provider is
/// shared; counters and call records accumulate as the planner drives it.
#[derive(Debug, Default)]
pub(crate) struct TestProvider {
    /// Non-empty keys make every diff demand replacement.
    pub(crate) replace_keys: Vec<String>,
    /// Stable keys reported for in-place updates.
    pub(crate) stable_keys: Vec<String>,
    /// Defaults merged into checked inputs when prior inputs are present.
    pub(crate) defaults_from_olds: PropertyMap,
    /// Failures returned by every check.
    pub(crate) check_failures: Vec<CheckFailure>,
    /// Error returned by create instead of succeeding.
    pub(crate) create_error: Option<ProviderError>,
    /// Error returned by update instead of succeeding.
    pub(crate) update_error: Option<ProviderError>,
    /// Outputs reported by successful creates and updates.
    pub(crate) outputs: PropertyMap,
    /// Sequence for generated resource ids.
    pub(crate) next_id: AtomicUsize,
    /// Every configuration map received, in call order.
    pub(crate) configures: Mutex<Vec<BTreeMap<String, String>>>,
    /// Number of check calls.
    pub(crate) checks: AtomicUsize,
    /// Number of create calls.
    pub(crate) creates: AtomicUsize,
    /// Ids deleted, in call order.
    pub(crate) deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl Provider for TestProvider {
    async fn configure(&self, config: &BTreeMap<String, String>) -> Result<(), ProviderError> {
        self.configures
            .lock()
            .expect("lock poisoned")
            .push(config.clone());
        Ok(())
    }

    async fn check(
        &self,
        _urn: &Urn,
        olds: Option<&PropertyMap>,
        news: &PropertyMap,
    ) -> Result<CheckResult, ProviderError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let mut inputs = news.clone();
        if olds.is_some() {
            inputs.merge(self.defaults_from_olds.clone());
        }
        Ok(CheckResult {
            inputs,
            failures: self.check_failures.clone(),
        })
    }

    async fn diff(
        &self,
        _urn: &Urn,
        _id: &str,
        _olds: &PropertyMap,
        _news: &PropertyMap,
    ) -> Result<DiffResult, ProviderError> {
        if self.replace_keys.is_empty() {
            Ok(DiffResult::changes(self.stable_keys.clone()))
        } else {
            Ok(DiffResult::replacement(self.replace_keys.clone()))
        }
    }

    async fn create(
        &self,
        _urn: &Urn,
        _inputs: &PropertyMap,
    ) -> Result<CreateResult, ProviderError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.create_error {
            return Err(err.clone());
        }
        let id = format!("created-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        Ok(CreateResult {
            id,
            outputs: self.outputs.clone(),
        })
    }

    async fn update(
        &self,
        _urn: &Urn,
        _id: &str,
        _olds: &PropertyMap,
        _news: &PropertyMap,
        _stable_keys: &[String],
    ) -> Result<PropertyMap, ProviderError> {
        if let Some(err) = &self.update_error {
            return Err(err.clone());
        }
        Ok(self.outputs.clone())
    }

    async fn delete(
        &self,
        _urn: &Urn,
        id: &str,
        _inputs: &PropertyMap,
    ) -> Result<(), ProviderError> {
        self.deleted
            .lock()
            .expect("lock poisoned")
            .push(id.to_string());
        Ok(())
    }
}

/// Creates a default-behavior provider.
pub(crate) fn create_test_provider() -> Arc<TestProvider> {
    Arc::new(TestProvider::default())
}

/// An analyzer that raises a fixed set of failures for every resource.
#[derive(Debug, Default)]
pub(crate) struct TestAnalyzer {
    /// Failures raised on every analyze call.
    pub(crate) failures: Vec<AnalyzeFailure>,
}

#[async_trait]
impl Analyzer for TestAnalyzer {
    async fn analyze(
        &self,
        _ty: &ResourceType,
        _inputs: &PropertyMap,
    ) -> Result<Vec<AnalyzeFailure>, ProviderError> {
        Ok(self.failures.clone())
    }
}

/// An in-memory plugin host with fixed provider and analyzer tables.
#[derive(Debug, Default)]
pub(crate) struct TestHost {
    /// Providers by package.
    providers: HashMap<String, Arc<dyn Provider>>,
    /// Analyzers by name.
    analyzers: HashMap<String, Arc<dyn Analyzer>>,
    /// Plugin inventory reported to snapshots.
    plugins: Vec<PluginInfo>,
    /// Provider lookups received, in call order.
    pub(crate) lookups: Mutex<Vec<String>>,
}

impl Host for TestHost {
    fn provider(&self, package: &str) -> Result<Option<Arc<dyn Provider>>, PluginError> {
        self.lookups
            .lock()
            .expect("lock poisoned")
            .push(package.to_string());
        Ok(self.providers.get(package).cloned())
    }

    fn analyzer(&self, name: &str) -> Result<Option<Arc<dyn Analyzer>>, PluginError> {
        Ok(self.analyzers.get(name).cloned())
    }

    fn list_plugins(&self) -> Vec<PluginInfo> {
        self.plugins.clone()
    }
}

/// Creates a host from provider and analyzer tables.
pub(crate) fn create_test_host(
    providers: &[(&str, Arc<TestProvider>)],
    analyzers: &[(&str, Arc<TestAnalyzer>)],
    plugins: Vec<PluginInfo>,
) -> Arc<TestHost> {
    Arc::new(TestHost {
        providers: providers
            .iter()
            .map(|(package, provider)| {
                ((*package).to_string(), provider.clone() as Arc<dyn Provider>)
            })
            .collect(),
        analyzers: analyzers
            .iter()
            .map(|(name, analyzer)| ((*name).to_string(), analyzer.clone() as Arc<dyn Analyzer>))
            .collect(),
        plugins,
        lookups: Mutex::new(Vec::new()),
    })
}

/// A registration event whose completion can be observed.
#[derive(Debug)]
pub(crate) struct TestRegistration {
    /// The registered goal.
    goal: ResourceGoal,
    /// Set once the planner calls `done`.
    pub(crate) completed: AtomicBool,
}

impl TestRegistration {
    /// Wraps a goal in a registration event.
    pub(crate) fn new(goal: ResourceGoal) -> Arc<Self> {
        Arc::new(Self {
            goal,
            completed: AtomicBool::new(false),
        })
    }
}

impl RegisterResourceEvent for TestRegistration {
    fn goal(&self) -> &ResourceGoal {
        &self.goal
    }

    fn done(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }
}

/// An output completion event whose completion can be observed.
#[derive(Debug)]
pub(crate) struct TestOutputs {
    /// URN of the registration being completed.
    urn: Urn,
    /// Outputs to append.
    outputs: Option<PropertyMap>,
    /// Set once the planner calls `done`.
    pub(crate) completed: AtomicBool,
}

impl TestOutputs {
    /// Wraps outputs in a completion event.
    pub(crate) fn new(urn: Urn, outputs: Option<PropertyMap>) -> Arc<Self> {
        Arc::new(Self {
            urn,
            outputs,
            completed: AtomicBool::new(false),
        })
    }
}

impl RegisterResourceOutputsEvent for TestOutputs {
    fn urn(&self) -> &Urn {
        &self.urn
    }

    fn outputs(&self) -> Option<&PropertyMap> {
        self.outputs.as_ref()
    }

    fn done(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }
}

/// Builds a registration event, returning both the handle and the event.
pub(crate) fn register(goal: ResourceGoal) -> (Arc<TestRegistration>, SourceEvent) {
    let event = TestRegistration::new(goal);
    (event.clone(), SourceEvent::RegisterResource(event))
}

/// Builds an output completion event, returning the handle and the event.
pub(crate) fn complete(
    urn: Urn,
    outputs: Option<PropertyMap>,
) -> (Arc<TestOutputs>, SourceEvent) {
    let event = TestOutputs::new(urn, outputs);
    (event.clone(), SourceEvent::RegisterResourceOutputs(event))
}

/// A source that replays a fixed event sequence.
#[derive(Debug)]
pub(crate) struct TestSource {
    /// Events handed to the iterator, in order.
    events: Mutex<VecDeque<SourceEvent>>,
    /// Set once the iterator is closed.
    closed: Arc<AtomicBool>,
}

impl TestSource {
    /// Creates a source replaying the given events.
    pub(crate) fn new(events: Vec<SourceEvent>) -> Self {
        Self {
            events: Mutex::new(events.into()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the flag set when the source iterator is closed.
    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

#[async_trait]
impl Source for TestSource {
    fn package(&self) -> &str {
        PACKAGE
    }

    async fn iterate(&self, _opts: &Options) -> EngineResult<Box<dyn SourceIterator>> {
        let events = std::mem::take(&mut *self.events.lock().expect("lock poisoned"));
        Ok(Box::new(TestSourceIterator {
            events,
            finished: false,
            closed: self.closed.clone(),
        }))
    }
}

/// The iterator half of [`TestSource`].
#[derive(Debug)]
struct TestSourceIterator {
    /// Remaining events.
    events: VecDeque<SourceEvent>,
    /// True once end-of-stream has been reported.
    finished: bool,
    /// Shared closed flag.
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl SourceIterator for TestSourceIterator {
    async fn next(&mut self) -> EngineResult<Option<SourceEvent>> {
        assert!(!self.finished, "next called after end of stream");
        match self.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> EngineResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A diagnostic sink that collects every message.
#[derive(Debug, Default)]
pub(crate) struct CollectingSink {
    /// Messages received, in order.
    pub(crate) errors: Mutex<Vec<String>>,
}

impl DiagnosticSink for CollectingSink {
    fn error(&self, message: &str) {
        self.errors
            .lock()
            .expect("lock poisoned")
            .push(message.to_string());
    }
}

/// Event hooks that record their invocations and can be made to fail.
#[derive(Debug, Default)]
pub(crate) struct RecordingEvents {
    /// Hook invocations, in order.
    pub(crate) log: Mutex<Vec<String>>,
    /// Make the pre-step hook fail.
    pub(crate) fail_pre: bool,
    /// Make the post-step hook fail.
    pub(crate) fail_post: bool,
}

impl PlanEvents for RecordingEvents {
    fn on_resource_step_pre(&self, step: &Step) -> EngineResult<EventContext> {
        if self.fail_pre {
            return Err(EngineError::internal("pre hook refused"));
        }
        self.log
            .lock()
            .expect("lock poisoned")
            .push(format!("pre:{}:{}", step.op(), step.urn().name()));
        Ok(Box::new(step.urn()))
    }

    fn on_resource_step_post(
        &self,
        context: EventContext,
        step: &Step,
        status: ResourceStatus,
        error: Option<&EngineError>,
    ) -> EngineResult<()> {
        let threaded = context
            .downcast_ref::<Urn>()
            .is_some_and(|urn| *urn == step.urn());
        self.log.lock().expect("lock poisoned").push(format!(
            "post:{}:{}:{status}:ctx={threaded}:err={}",
            step.op(),
            step.urn().name(),
            error.is_some()
        ));
        if self.fail_post {
            return Err(EngineError::internal("post hook refused"));
        }
        Ok(())
    }

    fn on_resource_outputs(&self, step: &Step) -> EngineResult<()> {
        self.log
            .lock()
            .expect("lock poisoned")
            .push(format!("outputs:{}", step.urn().name()));
        Ok(())
    }
}

/// Builds a plan over the fixture target and a replayed event sequence.
pub(crate) fn create_test_plan(
    host: Arc<TestHost>,
    prev: Option<Snapshot>,
    events: Vec<SourceEvent>,
) -> Plan {
    Plan::new(
        host,
        Target::new(TARGET),
        prev,
        Box::new(TestSource::new(events)),
    )
}

/// Drives an iterator to completion, applying every step in order.
///
/// Returns the applied `(op, urn)` sequence.
pub(crate) async fn drive(iter: &mut PlanIterator<'_>) -> EngineResult<Vec<(StepOp, Urn)>> {
    let mut applied = Vec::new();
    while let Some(step) = iter.next().await? {
        let op = step.op();
        let urn = step.urn();
        iter.apply(step, false).await?;
        applied.push((op, urn));
    }
    Ok(applied)
}
