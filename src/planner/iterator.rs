//! The plan iterator.
//!
//! A single-threaded state machine driven by repeated calls to [`next`]:
//! while the source streams, registrations are diffed into steps; once the
//! source drains, pending deletes are emitted in reverse snapshot order.
//! [`apply`] performs a step and records its result, and [`snap`] can
//! produce a consistent snapshot at any point in between.
//!
//! [`next`]: PlanIterator::next
//! [`apply`]: PlanIterator::apply
//! [`snap`]: PlanIterator::snap

use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

use crate::error::{PlanError, Result, StepError};
use crate::plugin::{PluginInfo, ResourceStatus};
use crate::resource::{StateCell, Urn};
use crate::snapshot::{ENGINE_VERSION, Manifest, Snapshot};
use crate::source::{RegisterResourceOutputsEvent, SourceEvent, SourceIterator};

use super::plan::{Options, Plan};
use super::step::Step;

/// Steps through and/or executes a plan's proposed actions.
///
/// The iterator is not safe for concurrent use: callers hold it between
/// [`next`](Self::next) and [`apply`](Self::apply), and any parallelism in
/// downstream step execution must serialize around it.
#[derive(Debug)]
pub struct PlanIterator<'a> {
    /// The plan this iterator belongs to.
    plan: &'a Plan,
    /// The options the iterator was started with.
    opts: Options,
    /// The iterator that fetches source events.
    src: Box<dyn SourceIterator>,

    /// All URNs seen in the current stream.
    pub(super) urns: HashSet<Urn>,
    /// URNs discovered to be created.
    pub(super) creates: HashSet<Urn>,
    /// URNs discovered to be updated.
    pub(super) updates: HashSet<Urn>,
    /// URNs discovered to be replaced.
    pub(super) replaces: HashSet<Urn>,
    /// URNs discovered to be deleted.
    deletes: HashSet<Urn>,
    /// URNs discovered to be unchanged.
    pub(super) sames: HashSet<Urn>,

    /// Buffered steps still to be handed out.
    stepqueue: VecDeque<Step>,
    /// Deletes left to perform once the source has drained.
    delqueue: VecDeque<StateCell>,
    /// The resulting ordered resource states.
    resources: Vec<StateCell>,
    /// Logical steps awaiting their output completion, by URN.
    regs: HashMap<Urn, Step>,
    /// Identity keys of prior states superseded by this plan.
    dones: HashSet<usize>,

    /// True once the source has been run to completion.
    srcdone: bool,
    /// True once planning and iteration have finished.
    done: bool,
}

impl<'a> PlanIterator<'a> {
    /// Creates an iterator over a freshly started plan.
    pub(crate) fn new(plan: &'a Plan, opts: Options, src: Box<dyn SourceIterator>) -> Self {
        Self {
            plan,
            opts,
            src,
            urns: HashSet::new(),
            creates: HashSet::new(),
            updates: HashSet::new(),
            replaces: HashSet::new(),
            deletes: HashSet::new(),
            sames: HashSet::new(),
            stepqueue: VecDeque::new(),
            delqueue: VecDeque::new(),
            resources: Vec::new(),
            regs: HashMap::new(),
            dones: HashSet::new(),
            srcdone: false,
            done: false,
        }
    }

    /// Returns the plan this iterator belongs to.
    #[must_use]
    pub const fn plan(&self) -> &'a Plan {
        self.plan
    }

    /// Returns the options the iterator was started with.
    #[must_use]
    pub const fn opts(&self) -> &Options {
        &self.opts
    }

    /// Returns the number of mutating steps discovered so far.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.creates.len() + self.updates.len() + self.replaces.len() + self.deletes.len()
    }

    /// Returns the URNs discovered to be created.
    #[must_use]
    pub const fn creates(&self) -> &HashSet<Urn> {
        &self.creates
    }

    /// Returns the URNs discovered to be updated.
    #[must_use]
    pub const fn updates(&self) -> &HashSet<Urn> {
        &self.updates
    }

    /// Returns the URNs discovered to be replaced.
    #[must_use]
    pub const fn replaces(&self) -> &HashSet<Urn> {
        &self.replaces
    }

    /// Returns the URNs discovered to be deleted.
    #[must_use]
    pub const fn deletes(&self) -> &HashSet<Urn> {
        &self.deletes
    }

    /// Returns the URNs discovered to be unchanged.
    #[must_use]
    pub const fn sames(&self) -> &HashSet<Urn> {
        &self.sames
    }

    /// Returns the ordered resource states committed so far.
    #[must_use]
    pub fn resources(&self) -> &[StateCell] {
        &self.resources
    }

    /// Returns true once planning and iteration have finished.
    #[must_use]
    pub const fn done(&self) -> bool {
        self.done
    }

    /// Advances the plan and returns the next step to perform.
    ///
    /// Evaluates as much of the source as necessary to decide the next
    /// step; returns `Ok(None)` once the plan has nothing further to do.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails, a plugin cannot be loaded, a
    /// provider call fails, or a resource fails validation. The iterator's
    /// accumulated state remains valid for [`snap`](Self::snap).
    pub async fn next(&mut self) -> Result<Option<Step>> {
        while !self.done {
            // Multi-step sequences are handed out one at a time.
            if let Some(step) = self.stepqueue.pop_front() {
                return Ok(Some(step));
            }

            if self.srcdone {
                // The source has finished; drain the deletions that piled up.
                if let Some(step) = self.next_delete_step() {
                    return Ok(Some(step));
                }
                self.done = true;
                break;
            }

            match self.src.next().await? {
                Some(SourceEvent::RegisterResource(event)) => {
                    let mut steps = self.register_resource_steps(event).await?;
                    assert!(!steps.is_empty(), "registration produced no steps");
                    let head = steps.remove(0);
                    self.stepqueue.extend(steps);
                    return Ok(Some(head));
                }
                Some(SourceEvent::RegisterResourceOutputs(event)) => {
                    // Completions update an existing registration; they are
                    // never surfaced to the caller as steps.
                    self.register_resource_outputs(&event)?;
                }
                None => {
                    self.srcdone = true;
                    self.delqueue = self.compute_deletes();
                }
            }
        }
        Ok(None)
    }

    /// Performs a plan step and records its result in the iterator's state.
    ///
    /// Raises the pre-step hook, applies the step, tracks logical steps
    /// until their output completion arrives, and raises the post-step hook
    /// whether or not the step succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if a hook or the step itself fails; the error's
    /// [`status`](crate::error::EngineError::status) preserves the step's
    /// resource status.
    pub async fn apply(&mut self, step: Step, preview: bool) -> Result<ResourceStatus> {
        let urn = step.urn();

        let mut context = None;
        if let Some(events) = self.opts.events.clone() {
            context = Some(events.on_resource_step_pre(&step).map_err(|e| {
                StepError::PreStepHook {
                    message: e.to_string(),
                }
            })?);
        }

        debug!("Applying {} step on '{urn}' (preview {preview})", step.op());
        let result = step.execute(self, preview).await;
        let status = match &result {
            Ok(status) => *status,
            Err(err) => err.status(),
        };

        if result.is_ok() && step.logical() {
            if self.regs.contains_key(&urn) {
                return Err(PlanError::DuplicateRegistration { urn }.into());
            }
            self.regs.insert(urn, step.clone());
        }

        if let Some(events) = self.opts.events.clone()
            && let Some(context) = context
            && let Err(err) = events.on_resource_step_post(context, &step, status, result.as_ref().err())
        {
            return Err(StepError::PostStepHook {
                status,
                message: err.to_string(),
            }
            .into());
        }

        result
    }

    /// Terminates the iteration, shutting the source iterator down.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to close.
    pub async fn close(&mut self) -> Result<()> {
        self.src.close().await
    }

    /// Completes a pending registration with extra output properties.
    ///
    /// # Panics
    ///
    /// Panics if no registration is pending for the event's URN; a stray
    /// completion is a contract violation by the source.
    fn register_resource_outputs(
        &mut self,
        event: &Arc<dyn RegisterResourceOutputsEvent>,
    ) -> Result<()> {
        let urn = event.urn();
        let Some(reg) = self.regs.remove(urn) else {
            panic!("cannot complete resource '{urn}': no registration is pending");
        };

        if let Some(outputs) = event.outputs() {
            let new = reg
                .new_state()
                .unwrap_or_else(|| panic!("pending registration for '{urn}' holds no new state"));
            new.write().add_outputs(outputs.clone());
        }

        if let Some(events) = &self.opts.events
            && let Err(err) = events.on_resource_outputs(&reg)
        {
            return Err(StepError::OutputsHook {
                urn: urn.clone(),
                message: err.to_string(),
            }
            .into());
        }

        // Let the source know we are done processing the completion.
        event.done();
        Ok(())
    }

    /// Builds the list of deletes to perform once the source has drained.
    ///
    /// The prior snapshot is walked backwards: the list is in dependency
    /// order, and dependents must be deleted before their dependencies.
    fn compute_deletes(&self) -> VecDeque<StateCell> {
        let mut dels = VecDeque::new();
        if let Some(prev) = self.plan.prev() {
            for res in prev.resources.iter().rev() {
                let state = res.read();
                let urn = &state.urn;
                assert!(
                    !self.creates.contains(urn) || state.delete,
                    "created resource '{urn}' would shadow a live prior resource"
                );
                if state.delete
                    || (!self.sames.contains(urn) && !self.updates.contains(urn))
                    || self.replaces.contains(urn)
                {
                    dels.push_back(res.clone());
                }
            }
        }
        dels
    }

    /// Produces the next delete step, if any remain.
    fn next_delete_step(&mut self) -> Option<Step> {
        let del = self.delqueue.pop_front()?;
        let urn = del.read().urn.clone();
        self.deletes.insert(urn.clone());
        let replacing = self.replaces.contains(&urn);
        if replacing {
            debug!("Planner decided to delete '{urn}' due to replacement");
        } else {
            debug!("Planner decided to delete '{urn}'");
        }
        Some(Step::delete(del, replacing))
    }

    /// Returns a fresh snapshot of everything that has happened so far.
    ///
    /// If the plan is still running (or failed partway), prior resources not
    /// yet superseded are retained after the current plan's states, in their
    /// original order; preserving that order is what keeps the merged list a
    /// valid topological sort of the combined DAG.
    #[must_use]
    pub fn snap(&self) -> Snapshot {
        let mut resources = self.resources.clone();

        if !self.done && let Some(prev) = self.plan.prev() {
            for res in &prev.resources {
                if !self.dones.contains(&res.addr()) {
                    resources.push(res.clone());
                }
            }
        }

        let (version, plugins) = self.snap_versions();
        let manifest = Manifest::new(Utc::now(), version, plugins);
        Snapshot::new(self.plan.target().name.clone(), manifest, resources)
    }

    /// Returns the engine version and plugin inventory for a snapshot.
    ///
    /// The plugin list is captured from the host by value; no attempt is
    /// made to merge with the inventory of prior snapshots.
    #[must_use]
    pub fn snap_versions(&self) -> (String, Vec<PluginInfo>) {
        (ENGINE_VERSION.to_string(), self.plan.host().list_plugins())
    }

    /// Marks a prior state snapshot as superseded by the current plan.
    ///
    /// Superseded states are dropped from merged snapshots; anything not
    /// yet marked is retained so partial failures lose no state.
    pub fn mark_state_snapshot(&mut self, state: &StateCell) {
        self.dones.insert(state.addr());
        debug!("Marked old state snapshot as done: '{}'", state.read().urn);
    }

    /// Appends a resource's state to the current snapshot.
    pub fn append_state_snapshot(&mut self, state: StateCell) {
        debug!("Appended new state snapshot: '{}'", state.read().urn);
        self.resources.push(state);
    }
}
