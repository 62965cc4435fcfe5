//! Plan steps.
//!
//! A step is a single planned operation on a single resource. The six
//! variants share a narrow surface (URN, operation, old/new state access)
//! and differ in what applying them does: provider calls, state
//! bookkeeping, or nothing at all for purely logical markers.

use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, StepError};
use crate::plugin::{ProviderError, ResourceStatus};
use crate::resource::{StateCell, Urn};
use crate::source::RegisterResourceEvent;

use super::iterator::PlanIterator;

/// The operation a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOp {
    /// Nothing to do; state is carried forward.
    Same,
    /// Create a new resource.
    Create,
    /// Update an existing resource in place.
    Update,
    /// Create the replacement instance of a resource being replaced.
    CreateReplacement,
    /// Logical marker pairing a replacement's create with its later delete.
    Replace,
    /// Delete an existing resource.
    Delete,
}

impl std::fmt::Display for StepOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Same => "same",
            Self::Create => "create",
            Self::Update => "update",
            Self::CreateReplacement => "create-replacement",
            Self::Replace => "replace",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// A single planned operation on a single resource.
#[derive(Debug, Clone)]
pub enum Step {
    /// The resource is unchanged; its recorded state is carried forward.
    Same {
        /// The registration this step answers.
        event: Arc<dyn RegisterResourceEvent>,
        /// Prior recorded state.
        old: StateCell,
        /// Fresh state the prior record is carried onto.
        new: StateCell,
    },
    /// The resource does not exist yet and must be created.
    Create {
        /// The registration this step answers.
        event: Arc<dyn RegisterResourceEvent>,
        /// State of the resource to create.
        new: StateCell,
    },
    /// The resource exists and its inputs can be updated in place.
    Update {
        /// The registration this step answers.
        event: Arc<dyn RegisterResourceEvent>,
        /// Prior recorded state.
        old: StateCell,
        /// Desired state after the update.
        new: StateCell,
        /// Input keys the provider guarantees not to change.
        stable_keys: Vec<String>,
    },
    /// The resource must be replaced: create the new instance first.
    CreateReplacement {
        /// The registration this step answers.
        event: Arc<dyn RegisterResourceEvent>,
        /// Prior recorded state, deleted after the source drains.
        old: StateCell,
        /// State of the replacement instance.
        new: StateCell,
        /// Input keys that forced the replacement.
        replace_keys: Vec<String>,
    },
    /// Logical marker pairing a replacement's create with its later delete.
    Replace {
        /// The state being replaced.
        old: StateCell,
        /// The replacement's state.
        new: StateCell,
        /// Input keys that forced the replacement.
        replace_keys: Vec<String>,
    },
    /// The resource is no longer wanted and must be deleted.
    Delete {
        /// The state to delete.
        old: StateCell,
        /// True when the delete is the tail of a replacement.
        replacing: bool,
    },
}

impl Step {
    /// Creates a no-op step carrying prior state forward.
    #[must_use]
    pub fn same(event: Arc<dyn RegisterResourceEvent>, old: StateCell, new: StateCell) -> Self {
        Self::Same { event, old, new }
    }

    /// Creates a resource creation step.
    #[must_use]
    pub fn create(event: Arc<dyn RegisterResourceEvent>, new: StateCell) -> Self {
        Self::Create { event, new }
    }

    /// Creates an in-place update step.
    #[must_use]
    pub fn update(
        event: Arc<dyn RegisterResourceEvent>,
        old: StateCell,
        new: StateCell,
        stable_keys: Vec<String>,
    ) -> Self {
        Self::Update {
            event,
            old,
            new,
            stable_keys,
        }
    }

    /// Creates the creation half of a replacement.
    #[must_use]
    pub fn create_replacement(
        event: Arc<dyn RegisterResourceEvent>,
        old: StateCell,
        new: StateCell,
        replace_keys: Vec<String>,
    ) -> Self {
        Self::CreateReplacement {
            event,
            old,
            new,
            replace_keys,
        }
    }

    /// Creates the logical marker half of a replacement.
    #[must_use]
    pub const fn replace(old: StateCell, new: StateCell, replace_keys: Vec<String>) -> Self {
        Self::Replace {
            old,
            new,
            replace_keys,
        }
    }

    /// Creates a deletion step.
    #[must_use]
    pub const fn delete(old: StateCell, replacing: bool) -> Self {
        Self::Delete { old, replacing }
    }

    /// Returns the operation this step performs.
    #[must_use]
    pub const fn op(&self) -> StepOp {
        match self {
            Self::Same { .. } => StepOp::Same,
            Self::Create { .. } => StepOp::Create,
            Self::Update { .. } => StepOp::Update,
            Self::CreateReplacement { .. } => StepOp::CreateReplacement,
            Self::Replace { .. } => StepOp::Replace,
            Self::Delete { .. } => StepOp::Delete,
        }
    }

    /// Returns the URN of the resource this step operates on.
    #[must_use]
    pub fn urn(&self) -> Urn {
        match self {
            Self::Same { new, .. }
            | Self::Create { new, .. }
            | Self::Update { new, .. }
            | Self::CreateReplacement { new, .. }
            | Self::Replace { new, .. } => new.read().urn.clone(),
            Self::Delete { old, .. } => old.read().urn.clone(),
        }
    }

    /// True if this step answers a registration the iterator must track
    /// until its output completion arrives.
    #[must_use]
    pub const fn logical(&self) -> bool {
        matches!(
            self,
            Self::Same { .. }
                | Self::Create { .. }
                | Self::Update { .. }
                | Self::CreateReplacement { .. }
        )
    }

    /// Returns the prior state this step reads, if any.
    #[must_use]
    pub const fn old_state(&self) -> Option<&StateCell> {
        match self {
            Self::Same { old, .. }
            | Self::Update { old, .. }
            | Self::CreateReplacement { old, .. }
            | Self::Replace { old, .. }
            | Self::Delete { old, .. } => Some(old),
            Self::Create { .. } => None,
        }
    }

    /// Returns the new state this step produces, if any.
    #[must_use]
    pub const fn new_state(&self) -> Option<&StateCell> {
        match self {
            Self::Same { new, .. }
            | Self::Create { new, .. }
            | Self::Update { new, .. }
            | Self::CreateReplacement { new, .. }
            | Self::Replace { new, .. } => Some(new),
            Self::Delete { .. } => None,
        }
    }

    /// Applies this step, recording its effects in the iterator's state.
    pub(crate) async fn execute(
        &self,
        iter: &mut PlanIterator<'_>,
        preview: bool,
    ) -> Result<ResourceStatus> {
        match self {
            Self::Same { event, old, new } => {
                // Nothing to perform; retain the id and outputs the prior
                // run recorded.
                {
                    let old_state = old.read();
                    let mut new_state = new.write();
                    new_state.id = old_state.id.clone();
                    new_state.outputs = old_state.outputs.clone();
                }
                iter.mark_state_snapshot(old);
                iter.append_state_snapshot(new.clone());
                event.done();
                Ok(ResourceStatus::Ok)
            }
            Self::Create { event, new } => {
                execute_create(iter, preview, event, new, StepOp::Create).await
            }
            Self::CreateReplacement {
                event, old, new, ..
            } => {
                let status =
                    execute_create(iter, preview, event, new, StepOp::CreateReplacement).await?;
                // The old instance lives on until the delete pass; mark it
                // so an interrupted run still knows to remove it.
                old.write().delete = true;
                Ok(status)
            }
            Self::Update {
                event,
                old,
                new,
                stable_keys,
            } => execute_update(iter, preview, event, old, new, stable_keys).await,
            Self::Replace { new, .. } => {
                debug!("Replace marker for '{}'", new.read().urn);
                Ok(ResourceStatus::Ok)
            }
            Self::Delete { old, .. } => execute_delete(iter, preview, old).await,
        }
    }
}

/// Creates the step's new resource through its provider and records it.
async fn execute_create(
    iter: &mut PlanIterator<'_>,
    preview: bool,
    event: &Arc<dyn RegisterResourceEvent>,
    new: &StateCell,
    op: StepOp,
) -> Result<ResourceStatus> {
    let (custom, ty, urn, inputs) = {
        let state = new.read();
        (
            state.custom,
            state.ty.clone(),
            state.urn.clone(),
            state.inputs.clone(),
        )
    };

    if !preview && custom {
        let provider = iter.plan().providers().require(&ty)?;
        match provider.create(&urn, &inputs).await {
            Ok(created) => {
                assert!(
                    !created.id.is_empty(),
                    "provider created resource '{urn}' without an id"
                );
                let mut state = new.write();
                state.id = created.id;
                state.outputs = created.outputs;
            }
            Err(err) => {
                let status = err.status();
                match err {
                    ProviderError::Partial {
                        message,
                        id,
                        outputs,
                    } => {
                        // The resource exists short of its goal state;
                        // record what the provider managed to report.
                        {
                            let mut state = new.write();
                            if let Some(id) = id {
                                state.id = id;
                            }
                            if let Some(outputs) = outputs {
                                state.outputs = outputs;
                            }
                        }
                        iter.append_state_snapshot(new.clone());
                        return Err(StepError::Apply {
                            op,
                            urn,
                            status,
                            message,
                        }
                        .into());
                    }
                    ProviderError::Unknown { message } => {
                        // The resource may exist; record it delete-marked so
                        // a later run removes the possible orphan.
                        new.write().delete = true;
                        iter.append_state_snapshot(new.clone());
                        return Err(StepError::Apply {
                            op,
                            urn,
                            status,
                            message,
                        }
                        .into());
                    }
                    ProviderError::Failed { message } => {
                        return Err(StepError::Apply {
                            op,
                            urn,
                            status,
                            message,
                        }
                        .into());
                    }
                }
            }
        }
    }

    iter.append_state_snapshot(new.clone());
    event.done();
    Ok(ResourceStatus::Ok)
}

/// Updates the step's resource in place through its provider.
async fn execute_update(
    iter: &mut PlanIterator<'_>,
    preview: bool,
    event: &Arc<dyn RegisterResourceEvent>,
    old: &StateCell,
    new: &StateCell,
    stable_keys: &[String],
) -> Result<ResourceStatus> {
    let (custom, ty, urn, news) = {
        let state = new.read();
        (
            state.custom,
            state.ty.clone(),
            state.urn.clone(),
            state.inputs.clone(),
        )
    };
    let (id, olds) = {
        let state = old.read();
        (state.id.clone(), state.inputs.clone())
    };

    // An update never changes the provider-assigned identifier.
    new.write().id = id.clone();

    if !preview && custom {
        let provider = iter.plan().providers().require(&ty)?;
        match provider.update(&urn, &id, &olds, &news, stable_keys).await {
            Ok(outputs) => new.write().outputs = outputs,
            Err(err) => {
                let status = err.status();
                match err {
                    ProviderError::Partial {
                        message, outputs, ..
                    } => {
                        if let Some(outputs) = outputs {
                            new.write().outputs = outputs;
                        }
                        iter.mark_state_snapshot(old);
                        iter.append_state_snapshot(new.clone());
                        return Err(StepError::Apply {
                            op: StepOp::Update,
                            urn,
                            status,
                            message,
                        }
                        .into());
                    }
                    // Nothing is known to have reached the new state; the
                    // prior record stays authoritative.
                    ProviderError::Failed { message } | ProviderError::Unknown { message } => {
                        return Err(StepError::Apply {
                            op: StepOp::Update,
                            urn,
                            status,
                            message,
                        }
                        .into());
                    }
                }
            }
        }
    }

    iter.mark_state_snapshot(old);
    iter.append_state_snapshot(new.clone());
    event.done();
    Ok(ResourceStatus::Ok)
}

/// Deletes the step's resource through its provider.
async fn execute_delete(
    iter: &mut PlanIterator<'_>,
    preview: bool,
    old: &StateCell,
) -> Result<ResourceStatus> {
    let (custom, ty, urn, id, inputs) = {
        let state = old.read();
        (
            state.custom,
            state.ty.clone(),
            state.urn.clone(),
            state.id.clone(),
            state.inputs.clone(),
        )
    };

    // A resource that never received an id cannot be addressed; there is
    // nothing to ask the provider to delete.
    if !preview && custom && !id.is_empty() {
        let provider = iter.plan().providers().require(&ty)?;
        if let Err(err) = provider.delete(&urn, &id, &inputs).await {
            return Err(StepError::Apply {
                op: StepOp::Delete,
                urn,
                status: err.status(),
                message: err.to_string(),
            }
            .into());
        }
    }

    iter.mark_state_snapshot(old);
    Ok(ResourceStatus::Ok)
}
