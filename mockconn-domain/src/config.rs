use std::time::Duration;

use super::error::{MockConnError, Result};

// ---------------------------------------------------------------------------
// LinkConfig
// ---------------------------------------------------------------------------

/// Configuration for one emulated connection.
///
/// A connection has two endpoints, labelled `addr1` and `addr2`; the labels
/// can be any strings. The same impairments apply to both directions of
/// travel. All fields default to a fast, clean link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    // ---
    /// Label of the first endpoint.
    pub addr1: String,

    /// Label of the second endpoint.
    pub addr2: String,

    /// Messages per second admitted past the rate limiter. Must be > 0.
    pub throughput: u32,

    /// In-flight buffer capacity in messages. 0 derives twice the
    /// bandwidth-delay product; see [`LinkConfig::effective_buffer`].
    pub buffer_size: usize,

    /// One-way propagation delay applied to every delivered message.
    pub latency: Duration,

    /// Probability `[0.0, 1.0]` that any admitted message is silently
    /// dropped.
    pub loss: f64,

    /// Default deadline applied to each write call. `None` = no default.
    pub write_timeout: Option<Duration>,

    /// Default deadline applied to each read call. `None` = no default.
    pub read_timeout: Option<Duration>,

    /// RNG seed for a reproducible loss sequence. `None` = random.
    pub seed: Option<u64>,
}

// ---

impl Default for LinkConfig {
    fn default() -> Self {
        // ---
        Self {
            addr1: "local".into(),
            addr2: "remote".into(),
            throughput: 1024,
            buffer_size: 0,
            latency: Duration::ZERO,
            loss: 0.0,
            write_timeout: None,
            read_timeout: None,
            seed: None,
        }
    }
}

// ---

impl LinkConfig {
    // ---
    /// Fast, clean link — no delay, no loss. Useful as a baseline.
    pub fn perfect() -> Self {
        Self::default()
    }

    // ---

    /// Flaky last-mile link: 128 msg/s, 20 ms one-way, 1 % loss.
    pub fn lossy() -> Self {
        // ---
        Self {
            throughput: 128,
            latency: Duration::from_millis(20),
            loss: 0.01,
            ..Default::default()
        }
    }

    // ---

    /// Geostationary-satellite profile: 128 msg/s, 500 ms one-way.
    pub fn satellite() -> Self {
        // ---
        Self {
            throughput: 128,
            latency: Duration::from_millis(500),
            ..Default::default()
        }
    }

    // ---

    /// Validate fields whose constraints the types cannot express.
    pub fn validate(&self) -> Result<()> {
        // ---
        if self.throughput == 0 {
            return Err(MockConnError::InvalidConfig(
                "throughput must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.loss) {
            return Err(MockConnError::InvalidConfig(format!(
                "loss must be within [0, 1], got {}",
                self.loss
            )));
        }
        Ok(())
    }

    // ---

    /// In-flight buffer capacity in messages.
    ///
    /// A configured `buffer_size` wins; 0 derives twice the bandwidth-delay
    /// product, floored at one message (a bounded channel needs at least
    /// one slot).
    pub fn effective_buffer(&self) -> usize {
        // ---
        if self.buffer_size > 0 {
            return self.buffer_size;
        }
        let bdp = 2.0 * f64::from(self.throughput) * self.latency.as_secs_f64();
        (bdp.ceil() as usize).max(1)
    }

    // ---

    /// Same impairments with the endpoint labels swapped — the reverse
    /// direction of the connection.
    pub fn reversed(&self) -> Self {
        // ---
        let mut config = self.clone();
        std::mem::swap(&mut config.addr1, &mut config.addr2);
        config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
