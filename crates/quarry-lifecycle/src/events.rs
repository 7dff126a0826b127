use quarry_core::VersionEntry;

use crate::error::LifecycleError;

/// Explicit notification interface for observers of lifecycle state.
/// Implementations must be safe to call from any worker task; a UI
/// implementation marshals onto its own thread.
pub trait EventSink: Send + Sync {
    /// The entry's observable state changed: busy slot, state, progress,
    /// or install status.
    fn entry_updated(&self, entry: &VersionEntry);

    /// One-shot failure notification for an operation boundary.
    /// Cancellations are never delivered here.
    fn operation_failed(&self, entry: &VersionEntry, error: &LifecycleError);
}

/// Discards all notifications; for headless use.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn entry_updated(&self, _entry: &VersionEntry) {}

    fn operation_failed(&self, _entry: &VersionEntry, _error: &LifecycleError) {}
}
