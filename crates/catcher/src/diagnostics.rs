//! Diagnostic sink for faults and binding errors.

use std::sync::{Arc, Mutex, PoisonError};

use catcher_core::Error;
use tracing::{Level, debug, error, info, trace, warn};

/// Receives diagnostics worth recording from a guarded run.
///
/// Implementations must not panic; a sink is called on the unwinding path too.
pub trait DiagnosticSink: Send + Sync {
    /// Record `message` about `error` at `level`.
    fn record(&self, level: Level, message: &str, error: &Error);
}

/// Sink that forwards to the `tracing` subscriber in scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, level: Level, message: &str, error: &Error) {
        match level {
            Level::ERROR => error!(error = %error, "{message}"),
            Level::WARN => warn!(error = %error, "{message}"),
            Level::INFO => info!(error = %error, "{message}"),
            Level::DEBUG => debug!(error = %error, "{message}"),
            _ => trace!(error = %error, "{message}"),
        }
    }
}

/// One diagnostic captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub error: String,
}

/// Sink that keeps diagnostics in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, level: Level, message: &str, error: &Error) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Diagnostic {
                level,
                message: message.to_owned(),
                error: error.to_string(),
            });
    }
}

/// Optional sink handle; diagnostics are dropped when unset.
#[derive(Clone, Default)]
pub(crate) struct Diagnostics {
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

impl Diagnostics {
    pub(crate) fn new(sink: Option<Arc<dyn DiagnosticSink>>) -> Self {
        Self { sink }
    }

    pub(crate) fn emit(&self, level: Level, message: &str, error: &Error) {
        if let Some(sink) = &self.sink {
            sink.record(level, message, error);
        }
    }
}
