//! The registration decision engine.
//!
//! For each registration pulled off the source, this decides the step
//! sequence that reconciles the desired state with the prior snapshot:
//! same, update, a create-replacement/replace pair, or a plain create.

use std::sync::Arc;
use tracing::debug;

use crate::error::{PlanError, PluginError, Result};
use crate::plugin::{CheckFailure, DiffResult};
use crate::resource::{ResourceState, StateCell, Urn};
use crate::source::RegisterResourceEvent;

use super::iterator::PlanIterator;
use super::step::Step;

impl PlanIterator<'_> {
    /// Produces the steps required to reach a registration's goal state.
    ///
    /// At least one step is always produced; replacements produce the
    /// two-step `[CreateReplacement, Replace]` sequence, which must be
    /// delivered and applied without other steps interleaved.
    ///
    /// The order of checks is part of the contract: duplicate URNs are
    /// diagnosed before any provider is consulted, analyzers see the
    /// provider's canonical inputs, and a replacement re-checks the
    /// original inputs because defaults carried over from the old resource
    /// no longer apply.
    pub(super) async fn register_resource_steps(
        &mut self,
        event: Arc<dyn RegisterResourceEvent>,
    ) -> Result<Vec<Step>> {
        let goal = event.goal().clone();
        let mut invalid = false;

        let urn = Urn::new(
            &self.plan().target().name,
            self.plan().source_package(),
            &goal.ty,
            &goal.name,
        );
        if !self.urns.insert(urn.clone()) {
            invalid = true;
            self.plan().diag().error(&format!(
                "Duplicate resource URN '{urn}'; give the resource a unique name"
            ));
        }

        // The state we will build up as operations are performed; it begins
        // with empty outputs and no identifier.
        let mut new = ResourceState::new(
            goal.ty.clone(),
            urn.clone(),
            goal.custom,
            goal.properties.clone(),
            goal.parent.clone(),
        );

        let old = self.plan().old(&urn).cloned();
        let olds = old.as_ref().map(|o| o.read().inputs.clone());

        // Logical resources have no provider; everything provider-shaped
        // below is skipped for them.
        let provider = if goal.custom {
            Some(self.plan().providers().require(&goal.ty)?)
        } else {
            None
        };

        // `news` keeps the original inputs: a replacement is re-checked
        // against these, not against the defaulted form.
        let news = new.inputs.clone();
        let mut inputs = new.inputs.clone();
        if let Some(provider) = &provider {
            let checked = provider
                .check(&urn, olds.as_ref(), &news)
                .await
                .map_err(|e| PlanError::Check {
                    urn: urn.clone(),
                    message: e.to_string(),
                })?;
            if self.issue_check_failures(&new, &checked.failures) {
                invalid = true;
            }
            inputs = checked.inputs;
            new.inputs = inputs.clone();
        }

        // Analyzers inspect the canonical inputs; a missing analyzer is
        // fatal, a failing one invalidates the resource.
        let analyzers = self.plan().analyzers().to_vec();
        for name in &analyzers {
            let analyzer =
                self.plan()
                    .host()
                    .analyzer(name)?
                    .ok_or_else(|| PluginError::AnalyzerNotFound {
                        name: name.clone(),
                    })?;
            let failures = analyzer
                .analyze(&new.ty, &inputs)
                .await
                .map_err(|e| PlanError::Analyze {
                    analyzer: name.clone(),
                    urn: urn.clone(),
                    message: e.to_string(),
                })?;
            for failure in failures {
                invalid = true;
                self.plan().diag().error(&format!(
                    "Analyzer '{name}' rejected resource '{urn}': {}: {}",
                    failure.property, failure.reason
                ));
            }
        }

        if invalid {
            return Err(PlanError::ResourceInvalid { urn }.into());
        }

        if let (Some(old), Some(olds)) = (old, olds) {
            {
                let old_state = old.read();
                assert!(
                    old_state.ty == new.ty,
                    "resource '{urn}' changed type from '{}' to '{}'",
                    old_state.ty,
                    new.ty
                );
            }

            if olds.deep_equals(&inputs) {
                // The properties didn't change; nothing to do.
                self.sames.insert(urn.clone());
                debug!("Planner decided not to update '{urn}' (same)");
                return Ok(vec![Step::same(event, old, StateCell::new(new))]);
            }

            // The properties changed; ask the provider whether the change
            // is an in-place update or a replacement.
            let diff = if let Some(provider) = &provider {
                let id = old.read().id.clone();
                provider
                    .diff(&urn, &id, &olds, &inputs)
                    .await
                    .map_err(|e| PlanError::Diff {
                        urn: urn.clone(),
                        message: e.to_string(),
                    })?
            } else {
                // Logical resources never replace.
                DiffResult::default()
            };

            if diff.replace {
                self.replaces.insert(urn.clone());

                // The first check assumed defaults would carry over from
                // the old resource; a replacement voids that assumption,
                // so recompute them with no prior inputs. Failures here
                // are fatal rather than merely invalidating.
                if let Some(provider) = &provider {
                    let checked = provider.check(&urn, None, &news).await.map_err(|e| {
                        PlanError::Check {
                            urn: urn.clone(),
                            message: e.to_string(),
                        }
                    })?;
                    if self.issue_check_failures(&new, &checked.failures) {
                        return Err(PlanError::ResourceInvalid { urn }.into());
                    }
                    new.inputs = checked.inputs;
                }

                debug!(
                    "Planner decided to replace '{urn}' (replace keys {:?})",
                    diff.replace_keys
                );
                let new = StateCell::new(new);
                return Ok(vec![
                    Step::create_replacement(
                        event,
                        old.clone(),
                        new.clone(),
                        diff.replace_keys.clone(),
                    ),
                    Step::replace(old, new, diff.replace_keys),
                ]);
            }

            self.updates.insert(urn.clone());
            debug!("Planner decided to update '{urn}'");
            return Ok(vec![Step::update(
                event,
                old,
                StateCell::new(new),
                diff.stable_keys,
            )]);
        }

        // The resource isn't in the old snapshot: create it.
        self.creates.insert(urn.clone());
        debug!("Planner decided to create '{urn}'");
        Ok(vec![Step::create(event, StateCell::new(new))])
    }

    /// Reports check failures to the diagnostic sink.
    ///
    /// Returns true if there was anything to report.
    pub(super) fn issue_check_failures(
        &self,
        new: &ResourceState,
        failures: &[CheckFailure],
    ) -> bool {
        if failures.is_empty() {
            return false;
        }
        for failure in failures {
            if let Some(property) = &failure.property {
                self.plan().diag().error(&format!(
                    "Resource '{}' ({}): property '{property}' value {:?} is invalid: {}",
                    new.urn.name(),
                    new.ty,
                    new.inputs.get(property),
                    failure.reason
                ));
            } else {
                self.plan().diag().error(&format!(
                    "Resource '{}' ({}) is invalid: {}",
                    new.urn.name(),
                    new.ty,
                    failure.reason
                ));
            }
        }
        true
    }
}
