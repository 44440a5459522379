//! Token-bucket admission pacing.

use tokio::time::{sleep_until, Duration, Instant};

// ---------------------------------------------------------------------------
// TokenBucket
// ---------------------------------------------------------------------------

/// Message-rate token bucket with a burst of one.
///
/// One token is granted per [`TokenBucket::acquire`] call, spaced `1/rate`
/// apart. The first token is available immediately. Idle time banks at most
/// the single burst token, so a slow consumer never earns a catch-up burst.
/// Dropping an in-flight `acquire` consumes nothing.
pub(crate) struct TokenBucket {
    // ---
    /// Grant spacing, `1/rate`.
    interval: Duration,

    /// When the next token becomes available.
    next_at: Instant,
}

// ---

impl TokenBucket {
    // ---
    pub(crate) fn new(rate: u32) -> Self {
        // ---
        Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(rate)),
            next_at: Instant::now(),
        }
    }

    // ---

    /// Wait for and consume the next token.
    pub(crate) async fn acquire(&mut self) {
        // ---
        let now = Instant::now();
        if now < self.next_at {
            sleep_until(self.next_at).await;
        }
        // A late arrival restarts spacing from now; the bucket never holds
        // more than the one burst token.
        self.next_at = self.next_at.max(now) + self.interval;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
