// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Halldyll Plan Engine
//!
//! The planning and deployment core of the Halldyll system: given the
//! previously recorded state of a set of managed resources and a stream of
//! desired-state registrations, it decides the operations needed to
//! reconcile the two, hands them out in dependency order, applies them
//! through resource providers, and can snapshot the result at any point.
//!
//! ## Overview
//!
//! A plan run is a funnel:
//!
//! 1. **Source events**: the program evaluator registers desired resource
//!    states one at a time; the end of the stream is not known in advance.
//! 2. **Decision engine**: each registration is checked, analyzed, and
//!    diffed against the prior snapshot into a step sequence (same, update,
//!    create, or a create-replacement/replace pair).
//! 3. **Step application**: the caller pulls steps from the iterator and
//!    applies them through provider plugins, with pre/post event hooks.
//! 4. **Snapshot**: at any point, including after a partial failure, the
//!    iterator can merge its progress with the unsuperseded prior state
//!    into a topologically valid snapshot.
//!
//! ## Modules
//!
//! - [`resource`]: URNs, property values, and resource state records
//! - [`plugin`]: provider/analyzer/host interfaces and the provider cache
//! - [`source`]: the desired-state event stream interfaces
//! - [`target`]: deployment targets and package-scoped configuration
//! - [`planner`]: plans, steps, the decision engine, and the plan iterator
//! - [`snapshot`]: snapshots and their manifests
//! - [`diag`]: diagnostic sinks for validation messages
//! - [`error`]: the engine error hierarchy

// ============================================================================
// Modules
// ============================================================================

pub mod diag;
pub mod error;
pub mod planner;
pub mod plugin;
pub mod resource;
pub mod snapshot;
pub mod source;
pub mod target;

// ============================================================================
// Re-exports
// ============================================================================

pub use diag::{DiagnosticSink, TracingSink};
pub use error::{EngineError, Result};
pub use planner::{EventContext, Options, Plan, PlanEvents, PlanIterator, Step, StepOp};
pub use plugin::{
    AnalyzeFailure, Analyzer, CheckFailure, CheckResult, CreateResult, DiffResult, Host,
    PluginInfo, PluginKind, Provider, ProviderError, ProviderRegistry, ResourceStatus,
};
pub use resource::{
    Asset, PropertyMap, PropertyValue, ResourceGoal, ResourceState, ResourceType, StateCell, Urn,
};
pub use snapshot::{ENGINE_VERSION, Manifest, Snapshot};
pub use source::{
    RegisterResourceEvent, RegisterResourceOutputsEvent, Source, SourceEvent, SourceIterator,
};
pub use target::{ConfigKey, ConfigValue, Decrypter, DecryptError, PlaintextDecrypter, Target};
