//! Progress reporting for long-running operations
//!
//! Core operations report human-readable status strings through a
//! [`ProgressSink`]. The sink is advisory: nothing in the core depends on it
//! and [`NoProgress`] discards everything. Sinks are called from whichever
//! thread does the work, so implementations must be `Send + Sync`.

/// One-way receiver of status messages
pub trait ProgressSink: Send + Sync {
    /// Receive a status message. Must not panic.
    fn report(&self, message: &str);
}

/// A sink that drops every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _message: &str) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}
