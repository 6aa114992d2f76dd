//! Progress-callback trait for per-artifact events.
//!
//! Inject an [`Arc<dyn ProcessProgressCallback>`] via
//! [`crate::config::ProcessConfigBuilder::progress_callback`] to receive
//! events as merge groups and split pages finish. The CLI uses this to drive
//! its progress bar; a server could forward the events to a channel.
//!
//! # Example
//!
//! ```rust
//! use pdf_splitmerge::{ProcessConfig, ProcessProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl ProcessProgressCallback for CountingCallback {
//!     fn on_artifact_complete(&self, unit: &str, filename: &str, bytes: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{unit} → {filename} ({bytes} bytes)");
//!     }
//! }
//!
//! let config = ProcessConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as units finish.
///
/// Units run concurrently, but events are delivered one at a time from the
/// task driving [`crate::process()`], in submission order: merge groups as
/// declared, then split pages ascending. All methods default to no-ops.
pub trait ProcessProgressCallback: Send + Sync {
    /// Called once after the directive is parsed, before any rendering.
    ///
    /// `split_pages` is the number of pages no merge group mentions.
    fn on_process_start(&self, merge_groups: usize, split_pages: usize) {
        let _ = (merge_groups, split_pages);
    }

    /// Called when a unit produced its artifact.
    ///
    /// # Arguments
    /// * `unit`     : e.g. `"merge of pages 1-3"` or `"split of page 4"`
    /// * `filename` : artifact file name
    /// * `bytes`    : encoded size
    fn on_artifact_complete(&self, unit: &str, filename: &str, bytes: usize) {
        let _ = (unit, filename, bytes);
    }

    /// Called when a unit failed.
    fn on_artifact_error(&self, unit: &str, error: &str) {
        let _ = (unit, error);
    }

    /// Called once after every unit has been attempted.
    fn on_process_complete(&self, artifacts: usize, failures: usize) {
        let _ = (artifacts, failures);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl ProcessProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::ProcessConfig`].
pub type ProgressCallback = Arc<dyn ProcessProgressCallback>;
