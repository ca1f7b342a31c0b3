//! Dispatch counters and Prometheus text exposition.
//!
//! Counters are atomics so the HTTP handlers can read them while batches run.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use batchrun_core::OutcomeStatus;

/// Process-wide dispatch counters.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    batches_completed: AtomicU64,
    batches_rejected: AtomicU64,
    batches_aborted: AtomicU64,
    items_succeeded: AtomicU64,
    items_failed: AtomicU64,
    items_cancelled: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl DispatchMetrics {
    pub fn batch_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_rejected(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_aborted(&self) {
        self.batches_aborted.fetch_add(1, Ordering::Relaxed);
    }

    fn item_started(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn items_stopped(&self, count: usize) {
        self.in_flight.fetch_sub(count, Ordering::SeqCst);
    }

    /// A terminal outcome was recorded, including for items that never ran.
    pub fn item_recorded(&self, status: OutcomeStatus) {
        let counter = match status {
            OutcomeStatus::Success => &self.items_succeeded,
            OutcomeStatus::Error => &self.items_failed,
            OutcomeStatus::Cancelled => &self.items_cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Items currently running across all batches.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of items ever running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Format all counters as Prometheus text.
    pub fn render(&self) -> String {
        let mut output = String::new();

        writeln!(
            output,
            "# HELP batchrun_batches_total Number of dispatched batches by result"
        )
        .ok();
        writeln!(output, "# TYPE batchrun_batches_total counter").ok();
        writeln!(
            output,
            "batchrun_batches_total{{result=\"completed\"}} {}",
            self.batches_completed.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(
            output,
            "batchrun_batches_total{{result=\"rejected\"}} {}",
            self.batches_rejected.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(
            output,
            "batchrun_batches_total{{result=\"aborted\"}} {}",
            self.batches_aborted.load(Ordering::Relaxed)
        )
        .ok();

        writeln!(output).ok();
        writeln!(
            output,
            "# HELP batchrun_items_total Number of items by outcome status"
        )
        .ok();
        writeln!(output, "# TYPE batchrun_items_total counter").ok();
        writeln!(
            output,
            "batchrun_items_total{{status=\"success\"}} {}",
            self.items_succeeded.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(
            output,
            "batchrun_items_total{{status=\"error\"}} {}",
            self.items_failed.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(
            output,
            "batchrun_items_total{{status=\"cancelled\"}} {}",
            self.items_cancelled.load(Ordering::Relaxed)
        )
        .ok();

        writeln!(output).ok();
        writeln!(output, "# HELP batchrun_items_in_flight Items currently running").ok();
        writeln!(output, "# TYPE batchrun_items_in_flight gauge").ok();
        writeln!(output, "batchrun_items_in_flight {}", self.in_flight()).ok();

        writeln!(output).ok();
        writeln!(
            output,
            "# HELP batchrun_items_in_flight_peak Highest number of items running at once"
        )
        .ok();
        writeln!(output, "# TYPE batchrun_items_in_flight_peak gauge").ok();
        writeln!(output, "batchrun_items_in_flight_peak {}", self.peak_in_flight()).ok();

        output
    }
}

/// One batch's share of the in-flight gauge.
///
/// Items still held when the guard drops are released, so the gauge comes
/// back down when a batch aborts or its future is dropped mid-run.
#[derive(Debug)]
pub struct InFlightGuard {
    metrics: Arc<DispatchMetrics>,
    held: usize,
}

impl InFlightGuard {
    pub fn new(metrics: Arc<DispatchMetrics>) -> Self {
        Self { metrics, held: 0 }
    }

    /// An item was admitted.
    pub fn acquire(&mut self) {
        self.held += 1;
        self.metrics.item_started();
    }

    /// An admitted item's execution returned.
    pub fn release(&mut self) {
        if self.held > 0 {
            self.held -= 1;
            self.metrics.items_stopped(1);
        }
    }

    /// Items admitted and not yet released.
    pub fn held(&self) -> usize {
        self.held
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.held > 0 {
            self.metrics.items_stopped(self.held);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_metrics() {
        let metrics = DispatchMetrics::default();
        let output = metrics.render();

        assert!(output.contains("batchrun_batches_total{result=\"completed\"} 0"));
        assert!(output.contains("batchrun_items_total{status=\"error\"} 0"));
        assert!(output.contains("batchrun_items_in_flight 0"));
    }

    #[test]
    fn test_in_flight_tracks_peak() {
        let metrics = Arc::new(DispatchMetrics::default());
        let mut guard = InFlightGuard::new(metrics.clone());
        guard.acquire();
        guard.acquire();
        guard.release();
        metrics.item_recorded(OutcomeStatus::Success);
        guard.acquire();
        guard.release();
        metrics.item_recorded(OutcomeStatus::Error);

        assert_eq!(guard.held(), 1);
        assert_eq!(metrics.in_flight(), 1);
        assert_eq!(metrics.peak_in_flight(), 2);

        let output = metrics.render();
        assert!(output.contains("batchrun_items_total{status=\"success\"} 1"));
        assert!(output.contains("batchrun_items_total{status=\"error\"} 1"));
        assert!(output.contains("batchrun_items_in_flight_peak 2"));
    }

    #[test]
    fn test_dropped_guard_releases_held_items() {
        let metrics = Arc::new(DispatchMetrics::default());
        let mut first = InFlightGuard::new(metrics.clone());
        let mut second = InFlightGuard::new(metrics.clone());
        first.acquire();
        first.acquire();
        second.acquire();
        assert_eq!(metrics.in_flight(), 3);

        drop(first);
        assert_eq!(metrics.in_flight(), 1);
        assert_eq!(metrics.peak_in_flight(), 3);

        second.release();
        drop(second);
        assert_eq!(metrics.in_flight(), 0);
    }
}
