//! Progress-callback trait for per-job conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] (or
//! [`crate::convert::Converter::with_progress`]) to receive events as the
//! orchestrator moves one file through the pipeline.
//!
//! The batch controller implements this trait with a forwarder that turns
//! every call into a [`crate::batch::BatchEvent`] on a channel, so the
//! presentation layer only ever sees typed messages.
//!
//! # Example
//!
//! ```rust
//! use pdf2docx::{ConversionProgressCallback, ConversionConfig, JobStatus};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl ConversionProgressCallback for LastPercent {
//!     fn on_progress(&self, _source: &Path, percent: u8, _status: JobStatus) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(LastPercent(AtomicU8::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::JobStatus;
use std::path::Path;
use std::sync::Arc;

/// Called by the orchestrator as one file moves through the pipeline.
///
/// Implementations must be `Send + Sync`: batch mode runs one orchestrator
/// per file on separate tokio tasks that may share a callback. All methods
/// have default no-op implementations.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the token is requested.
    fn on_job_start(&self, source: &Path) {
        let _ = source;
    }

    /// Called at each progress milestone (10, 30, 50, 70, 100).
    fn on_progress(&self, source: &Path, percent: u8, status: JobStatus) {
        let _ = (source, percent, status);
    }

    /// Called once after the output file has been written.
    fn on_job_complete(&self, source: &Path, output: &Path, bytes_written: u64) {
        let _ = (source, output, bytes_written);
    }

    /// Called once when the job fails or is cancelled.
    fn on_job_error(&self, source: &Path, error: &str) {
        let _ = (source, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let p = Path::new("a.pdf");
        cb.on_job_start(p);
        cb.on_progress(p, 10, JobStatus::Uploading);
        cb.on_job_complete(p, Path::new("a.docx"), 42);
        cb.on_job_error(p, "boom");
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_progress(Path::new("x.pdf"), 70, JobStatus::Polling);
    }
}
