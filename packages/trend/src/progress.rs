//! Progress reporting for batch extraction.
//!
//! [`ProgressCallback`] decouples the extractor from any rendering backend.
//! The CLI plugs in `indicatif` bars; library callers and tests use
//! [`null_progress`].

use std::sync::Arc;

/// Receives progress updates from a running extraction.
///
/// Implementations must be `Send + Sync`: updates arrive from blocking worker
/// threads.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of entities to process.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` entities.
    fn inc(&self, delta: u64);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Discards all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
