//! Diagnostic sinks for user-facing validation messages.
//!
//! Validation problems (duplicate URNs, check and analyzer failures) are
//! reported per resource before the plan errors out; the sink decides where
//! those messages land.

use tracing::error;

/// Receives user-facing diagnostics emitted during planning.
pub trait DiagnosticSink: std::fmt::Debug + Send + Sync {
    /// Reports an error-level diagnostic.
    fn error(&self, message: &str);
}

/// A diagnostic sink that forwards to the `tracing` error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn error(&self, message: &str) {
        error!("{message}");
    }
}
