//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ServeConfigBuilder::progress_callback`] to receive
//! real-time events as the dispatcher drives each document.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a database record or a terminal progress bar
//! without the library knowing how the host application communicates. The
//! trait is `Send + Sync` because documents are processed concurrently.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docserve::{BatchProgressCallback, ServeConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     converted: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_converted(&self, index: usize, name: &str) {
//!         let done = self.converted.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("#{index} {name} done ({done} so far)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { converted: AtomicUsize::new(0) });
//!
//! let config = ServeConfig::builder()
//!     .api_url("http://localhost:5001")
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the dispatcher as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is the position of the input in the batch;
/// `name` is the file name sent to the server.
///
/// # Thread safety
///
/// Per-document methods may be called concurrently from different tasks.
/// Implementations must protect shared mutable state with appropriate
/// synchronisation primitives (e.g. `Mutex`, `AtomicUsize`).
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any document is submitted.
    ///
    /// * `total`     — number of inputs in the batch
    /// * `submitted` — inputs that have a source and will be submitted
    fn on_batch_start(&self, total: usize, submitted: usize) {
        let _ = (total, submitted);
    }

    /// Called just before a document is submitted.
    fn on_document_start(&self, index: usize, name: &str) {
        let _ = (index, name);
    }

    /// Called when a document was converted and validated.
    fn on_document_converted(&self, index: usize, name: &str) {
        let _ = (index, name);
    }

    /// Called when a document ended without output but the batch continues.
    fn on_document_skipped(&self, index: usize, name: &str, reason: &str) {
        let _ = (index, name, reason);
    }

    /// Called when a document hit a fatal error. The batch will return that
    /// error once every in-flight document has finished.
    fn on_document_failed(&self, index: usize, name: &str, error: &str) {
        let _ = (index, name, error);
    }

    /// Called once after every document has been attempted (also when the
    /// batch ends in an error).
    fn on_batch_complete(&self, total: usize, converted: usize) {
        let _ = (total, converted);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ServeConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
