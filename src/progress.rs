//! Progress-callback trait for per-file events.
//!
//! Inject an [`Arc<dyn PrepProgressCallback>`] through a phase builder (for
//! example [`crate::config::SanitizeConfigBuilder::progress_callback`]) to
//! receive events as each file finishes. Files complete in any order, so
//! implementations are called concurrently from worker threads and must be
//! `Send + Sync`.
//!
//! # Example
//!
//! ```rust
//! use corpus_prep::{Phase, PrepProgressCallback, SanitizeConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl PrepProgressCallback for Counter {
//!     fn on_item_complete(&self, _phase: Phase, _path: &Path, _status: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = SanitizeConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The pipeline phase an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Extract,
    Sanitize,
    Bundle,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Extract => "extract",
            Phase::Sanitize => "sanitize",
            Phase::Bundle => "bundle",
        };
        f.write_str(s)
    }
}

/// Called by the orchestrators as they process files.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PrepProgressCallback: Send + Sync {
    /// Called once, after selection and before any task is dispatched.
    fn on_phase_start(&self, phase: Phase, total_items: usize) {
        let _ = (phase, total_items);
    }

    /// Called when one file has been classified.
    ///
    /// `status` is the outcome label, e.g. `"changed"` or `"ocr-flagged"`.
    fn on_item_complete(&self, phase: Phase, path: &Path, status: &str) {
        let _ = (phase, path, status);
    }

    /// Called once after every task of the phase has finished.
    fn on_phase_complete(&self, phase: Phase, total_items: usize) {
        let _ = (phase, total_items);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl PrepProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the phase configs.
pub type ProgressCallback = Arc<dyn PrepProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        statuses: Mutex<Vec<String>>,
        finished_total: AtomicUsize,
    }

    impl PrepProgressCallback for TrackingCallback {
        fn on_phase_start(&self, _phase: Phase, total_items: usize) {
            self.started_total.store(total_items, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _phase: Phase, _path: &Path, status: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.statuses.lock().unwrap().push(status.to_string());
        }

        fn on_phase_complete(&self, _phase: Phase, total_items: usize) {
            self.finished_total.store(total_items, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_phase_start(Phase::Sanitize, 3);
        cb.on_item_complete(Phase::Sanitize, Path::new("a.txt"), "changed");
        cb.on_phase_complete(Phase::Sanitize, 3);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_phase_start(Phase::Extract, 2);
        tracker.on_item_complete(Phase::Extract, Path::new("a.pdf"), "ok");
        tracker.on_item_complete(Phase::Extract, Path::new("b.pdf"), "failed");
        tracker.on_phase_complete(Phase::Extract, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.finished_total.load(Ordering::SeqCst), 2);
        assert_eq!(*tracker.statuses.lock().unwrap(), vec!["ok", "failed"]);
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::Sanitize.to_string(), "sanitize");
        assert_eq!(Phase::Extract.to_string(), "extract");
    }
}
