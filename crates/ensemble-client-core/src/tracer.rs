//! Counters and timings emitted by the connection layer.

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

/// Replayed background failure counter.
pub const BACKGROUND_EXCEPTIONS: &str = "background-exceptions";
/// Timed-out `get_session` counter.
pub const CONNECTIONS_TIMED_OUT: &str = "connections-timed-out";
/// Ensemble address drift counter.
pub const CONNECTION_STRING_CHANGED: &str = "connection-string-changed";
/// Session expiry counter.
pub const SESSION_EXPIRED: &str = "session-expired";
/// Timing of one observer call during dispatch.
pub const PARENT_PROCESS: &str = "connection-state-parent-process";

/// Metrics sink. Not required for correctness.
pub trait Tracer: Send + Sync {
    /// Record how long the named operation took.
    fn add_time(&self, name: &str, elapsed: Duration);

    /// Bump the named counter.
    fn add_count(&self, name: &str, amount: u64);
}

/// Tracer that forwards to `tracing` at trace level.
#[derive(Debug, Default, Clone)]
pub struct DefaultTracer;

impl Tracer for DefaultTracer {
    fn add_time(&self, name: &str, elapsed: Duration) {
        tracing::trace!(name, ?elapsed, "Trace");
    }

    fn add_count(&self, name: &str, amount: u64) {
        tracing::trace!(name, amount, "Counter");
    }
}

/// Times one operation and reports it on [`TimeTrace::commit`].
///
/// Dropping without committing records nothing.
#[must_use = "a TimeTrace records nothing until committed"]
pub struct TimeTrace {
    name: &'static str,
    tracer: Arc<dyn Tracer>,
    started: Instant,
}

impl TimeTrace {
    /// Start timing `name`.
    pub fn new(name: &'static str, tracer: Arc<dyn Tracer>) -> Self {
        Self {
            name,
            tracer,
            started: Instant::now(),
        }
    }

    /// Record the elapsed time.
    pub fn commit(self) {
        self.tracer.add_time(self.name, self.started.elapsed());
    }
}
