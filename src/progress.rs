//! Progress reporting for batch runs.
//!
//! Two pieces live here:
//!
//! * [`BatchProgressCallback`]: an observer trait injected through
//!   [`crate::config::BatchConfigBuilder::progress_callback`]. Callers
//!   forward events to a terminal progress bar, a channel or a log without
//!   the library knowing how they communicate.
//! * [`ProgressState`]: the shared counter every worker bumps after each
//!   attempted record. It decides when a progress line is due and computes
//!   the ETA.
//!
//! # Example
//!
//! ```rust
//! use pass2pdf::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_record_complete(&self, index: usize, total: usize, path: &std::path::Path) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} -> {}", index + 1, total, path.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::BatchSummary;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of attempted records between two progress lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 20;

/// Called by the orchestrator as records are processed.
///
/// Records are processed concurrently, so every method except
/// `on_batch_start` and `on_batch_complete` may be called from several
/// threads at once, in completion order. All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any record is attempted.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// A document was written to `path`. `index` is 0-based.
    fn on_record_complete(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// The record failed validation and was not rendered.
    fn on_record_skipped(&self, index: usize, total: usize, reason: &str) {
        let _ = (index, total, reason);
    }

    /// Filling, rendering or writing failed for this record.
    fn on_record_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every record has been attempted or cancelled.
    fn on_batch_complete(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}

/// A callback that ignores every event. Handy as a base for callers that
/// only override a few methods through a wrapper.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

/// Point-in-time view of a run, produced when a progress line is due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Estimated time to finish the remaining records.
    pub eta: Duration,
}

/// Shared attempt counter for one batch run.
///
/// Every attempted record (written, skipped or failed) increments the
/// counter exactly once. Cancelled records are never counted.
#[derive(Debug)]
pub struct ProgressState {
    processed: AtomicUsize,
    total: usize,
    interval: usize,
    started: Instant,
}

impl ProgressState {
    pub fn new(total: usize, interval: usize) -> Self {
        Self::starting_at(total, interval, Instant::now())
    }

    pub fn starting_at(total: usize, interval: usize, started: Instant) -> Self {
        Self {
            processed: AtomicUsize::new(0),
            total,
            interval: interval.max(1),
            started,
        }
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Count one attempted record. Returns a snapshot when the new count
    /// is a multiple of the interval or equals the total.
    pub fn record_attempt(&self) -> Option<ProgressSnapshot> {
        let processed = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
        if processed % self.interval != 0 && processed != self.total {
            return None;
        }
        let elapsed = self.started.elapsed();
        Some(ProgressSnapshot {
            processed,
            total: self.total,
            elapsed,
            eta: estimate_remaining(elapsed, processed, self.total),
        })
    }
}

/// `elapsed × (total − processed) / processed`, or zero before any record
/// has been processed.
pub fn estimate_remaining(elapsed: Duration, processed: usize, total: usize) -> Duration {
    if processed == 0 {
        return Duration::ZERO;
    }
    let remaining = total.saturating_sub(processed) as f64;
    Duration::from_secs_f64(elapsed.as_secs_f64() * remaining / processed as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        skips: AtomicUsize,
        errors: Mutex<Vec<String>>,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_record_complete(&self, _index: usize, _total: usize, _path: &Path) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_record_skipped(&self, _index: usize, _total: usize, _reason: &str) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }

        fn on_record_error(&self, _index: usize, _total: usize, error: &str) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(5);
        cb.on_record_complete(0, 5, Path::new("/tmp/a.pdf"));
        cb.on_record_skipped(1, 5, "missing seat");
        cb.on_record_error(2, 5, "render failed");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(3);
        tracker.on_record_complete(0, 3, Path::new("a.pdf"));
        tracker.on_record_skipped(1, 3, "blank");
        tracker.on_record_error(2, 3, "boom");

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.lock().unwrap().as_slice(), ["boom"]);
    }

    #[test]
    fn snapshot_on_interval_and_on_last_record() {
        let state = ProgressState::new(45, 20);
        let due: Vec<usize> = (0..45)
            .filter_map(|_| state.record_attempt())
            .map(|s| s.processed)
            .collect();
        assert_eq!(due, vec![20, 40, 45]);
        assert_eq!(state.processed(), 45);
    }

    #[test]
    fn small_batch_reports_only_at_the_end() {
        let state = ProgressState::new(3, 20);
        assert!(state.record_attempt().is_none());
        assert!(state.record_attempt().is_none());
        let last = state.record_attempt().unwrap();
        assert_eq!(last.processed, 3);
        assert_eq!(last.eta, Duration::ZERO);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let state = ProgressState::new(2, 0);
        assert!(state.record_attempt().is_some());
    }

    #[test]
    fn eta_is_proportional() {
        let eta = estimate_remaining(Duration::from_secs(10), 20, 100);
        assert_eq!(eta, Duration::from_secs(40));
        assert_eq!(
            estimate_remaining(Duration::from_secs(10), 0, 100),
            Duration::ZERO
        );
        assert_eq!(
            estimate_remaining(Duration::from_secs(10), 100, 100),
            Duration::ZERO
        );
    }

    #[test]
    fn concurrent_attempts_are_all_counted() {
        let state = Arc::new(ProgressState::new(400, 20));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    (0..100).filter(|_| state.record_attempt().is_some()).count()
                })
            })
            .collect();
        let snapshots: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(state.processed(), 400);
        assert_eq!(snapshots, 20);
    }
}
