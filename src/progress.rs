//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline finishes each page. Page boundaries are the only
//! checkpoints of a run, so this is also where a host application observes
//! progress or decides to stop waiting for the rest.
//!
//! # Example
//!
//! ```rust
//! use iwb_convert::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, index: usize, total_pages: usize, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page_{index} done ({output_len} bytes) of {total_pages}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Implementations must be `Send + Sync` because the async entry points run
/// the pipeline on a blocking worker thread. All methods have default no-op
/// implementations so callers only override what they care about.
///
/// Page indices are 0-based manifest positions, the same numbers used in
/// emitted file names.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after the manifest is parsed.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is transformed.
    fn on_page_start(&self, index: usize, total_pages: usize) {
        let _ = (index, total_pages);
    }

    /// Called when a page is written (SVG mode) or rendered (PDF mode).
    ///
    /// `output_len` is the byte length of the produced SVG or single-page PDF.
    fn on_page_complete(&self, index: usize, total_pages: usize, output_len: usize) {
        let _ = (index, total_pages, output_len);
    }

    /// Called when a page is skipped; `reason` is human-readable.
    fn on_page_skipped(&self, index: usize, total_pages: usize, reason: &str) {
        let _ = (index, total_pages, reason);
    }

    /// Called once after all pages have been attempted.
    fn on_run_complete(&self, attempted: usize, succeeded: usize) {
        let _ = (attempted, succeeded);
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
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        skips: AtomicUsize,
        run_total: AtomicUsize,
        run_succeeded: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_run_start(&self, total_pages: usize) {
            self.run_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_start(&self, _index: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _index: usize, _total_pages: usize, _output_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_skipped(&self, _index: usize, _total_pages: usize, _reason: &str) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _attempted: usize, succeeded: usize) {
            self.run_succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(5);
        cb.on_page_start(0, 5);
        cb.on_page_complete(0, 5, 42);
        cb.on_page_skipped(1, 5, "malformed");
        cb.on_run_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_run_start(3);
        tracker.on_page_start(0, 3);
        tracker.on_page_complete(0, 3, 100);
        tracker.on_page_start(1, 3);
        tracker.on_page_skipped(1, 3, "engine crashed");
        tracker.on_page_start(2, 3);
        tracker.on_page_complete(2, 3, 200);
        tracker.on_run_complete(3, 2);

        assert_eq!(tracker.run_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.run_succeeded.load(Ordering::SeqCst), 2);
    }
}
