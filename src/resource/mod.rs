//! Resource model for the planning engine.
//!
//! This module defines resource identity (URNs and type tokens), property
//! values and maps, and the state records the planner reads from prior
//! snapshots and writes as steps execute.

mod property;
mod state;
mod urn;

pub use property::{Asset, PropertyMap, PropertyValue};
pub use state::{ResourceGoal, ResourceState, StateCell};
pub use urn::{ResourceType, Urn};
