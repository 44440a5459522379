//! Single-writer metrics recorder backing [`LinkMetrics`] snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mockconn_domain::LinkMetrics;

// ---------------------------------------------------------------------------
// MetricsRecorder
// ---------------------------------------------------------------------------

/// Counters for one link direction.
///
/// `sent` / `lost` are written only by the pacer task and `delivered` /
/// `avg_latency_ns` only by the read path, so each counter has a single
/// writer; release stores publish coherent values to snapshot readers.
#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    // ---
    sent: AtomicU64,
    delivered: AtomicU64,
    lost: AtomicU64,
    avg_latency_ns: AtomicU64,
}

// ---

impl MetricsRecorder {
    // ---
    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn record_lost(&self) {
        self.lost.fetch_add(1, Ordering::Release);
    }

    // ---

    /// Fold one delivery into the running mean:
    /// `mean = mean·(n−1)/n + sample/n`. Only count and mean are retained.
    pub(crate) fn record_delivered(&self, elapsed: Duration) {
        // ---
        let n = self.delivered.load(Ordering::Relaxed) + 1;
        let prev = self.avg_latency_ns.load(Ordering::Relaxed) as f64;
        let sample = elapsed.as_nanos() as f64;
        let mean = prev * ((n - 1) as f64 / n as f64) + sample / n as f64;

        self.avg_latency_ns.store(mean as u64, Ordering::Release);
        self.delivered.store(n, Ordering::Release);
    }

    // ---

    pub(crate) fn snapshot(&self) -> LinkMetrics {
        // ---
        LinkMetrics {
            sent: self.sent.load(Ordering::Acquire),
            delivered: self.delivered.load(Ordering::Acquire),
            lost: self.lost.load(Ordering::Acquire),
            avg_latency: Duration::from_nanos(self.avg_latency_ns.load(Ordering::Acquire)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
