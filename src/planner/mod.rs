//! Planning module for deployment operations.
//!
//! This module decides how a stream of desired-state registrations
//! reconciles with the previous snapshot, hands the resulting steps out in
//! dependency order, and records their application.

mod decision;
mod iterator;
mod plan;
mod step;

#[cfg(test)]
pub(crate) mod testing;

pub use iterator::PlanIterator;
pub use plan::{EventContext, Options, Plan, PlanEvents};
pub use step::{Step, StepOp};
