//! Desired-state event sources.
//!
//! A source is the program evaluator that emits resource registrations as it
//! runs. The planner pulls events one at a time; the end of the stream is
//! not known in advance, and deletes are only computed once the source is
//! fully drained.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::planner::Options;
use crate::resource::{PropertyMap, ResourceGoal, Urn};

/// A request to register a resource's desired state.
///
/// `done` is invoked once the planner has applied the registration's step,
/// unblocking the program that emitted it.
pub trait RegisterResourceEvent: fmt::Debug + Send + Sync {
    /// The desired state being registered.
    fn goal(&self) -> &ResourceGoal;

    /// Signals the source that the registration has been processed.
    fn done(&self);
}

/// A request to complete a prior registration with extra output properties.
///
/// At most one completion is emitted per registration; `done` is invoked
/// after the outputs have been recorded.
pub trait RegisterResourceOutputsEvent: fmt::Debug + Send + Sync {
    /// URN of the previously registered resource.
    fn urn(&self) -> &Urn;

    /// The outputs to append, if any.
    fn outputs(&self) -> Option<&PropertyMap>;

    /// Signals the source that the completion has been processed.
    fn done(&self);
}

/// A single event pulled from a source iterator.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A resource registration.
    RegisterResource(Arc<dyn RegisterResourceEvent>),
    /// An output completion for a prior registration.
    RegisterResourceOutputs(Arc<dyn RegisterResourceOutputsEvent>),
}

/// A producer of desired-state events.
#[async_trait]
pub trait Source: fmt::Debug + Send + Sync {
    /// The package the source's program belongs to.
    fn package(&self) -> &str;

    /// Begins iterating the source's events.
    async fn iterate(&self, opts: &Options) -> Result<Box<dyn SourceIterator>>;
}

/// An in-progress iteration of a source's events.
#[async_trait]
pub trait SourceIterator: fmt::Debug + Send {
    /// Returns the next event, or `Ok(None)` exactly once at end of stream.
    ///
    /// Callers must not call `next` again after the end has been reported.
    async fn next(&mut self) -> Result<Option<SourceEvent>>;

    /// Shuts the iteration down and releases source-side resources.
    ///
    /// Closing is idempotent. In-flight work on the source side is not
    /// cancelled; that is the host's responsibility.
    async fn close(&mut self) -> Result<()>;
}
