use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// LinkMetrics
// ---------------------------------------------------------------------------

/// Point-in-time counters for one unidirectional link.
///
/// Snapshots are coherent but possibly stale. All fields read zero until
/// the first event; taking a snapshot never fails.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkMetrics {
    // ---
    /// Messages admitted past the rate limiter, including ones later lost.
    pub sent: u64,

    /// Messages handed to a reader.
    pub delivered: u64,

    /// Messages discarded by the random-loss draw.
    pub lost: u64,

    /// Running mean of admission-to-delivery latency.
    pub avg_latency: Duration,
}

// ---

impl LinkMetrics {
    // ---
    /// Observed loss ratio over admitted messages. 0 when nothing was sent.
    pub fn loss_rate(&self) -> f64 {
        // ---
        if self.sent == 0 {
            0.0
        } else {
            self.lost as f64 / self.sent as f64
        }
    }
}

// ---

impl fmt::Display for LinkMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        write!(
            f,
            "{} sent, {} delivered, {} lost ({:.1}%), avg latency {:?}",
            self.sent,
            self.delivered,
            self.lost,
            self.loss_rate() * 100.0,
            self.avg_latency,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
