//! The unidirectional emulated link.
//!
//! [`UniLink`] turns a stream of whole-message writes into a stream of
//! byte-oriented reads while imposing a throughput ceiling, a fixed one-way
//! delay, and independent random loss. Internally it is a three-channel
//! pipeline driven by two tasks:
//!
//! ```text
//! write ──► admission ──► PacerTask ──► in_flight ──► DelayTask ──► delivery ──► read
//!            (cap 1)    token bucket    (bounded)    sleep until     (cap 1)
//!                       loss draw                  admitted+latency
//! ```
//!
//! The bounded `in_flight` stage is the backpressure chain: a full buffer
//! parks the pacer, which parks writers on the admission channel. Each task
//! observes its half's close signal at every suspension point and exits by
//! dropping its downstream sender, which is how parked peers learn the link
//! went away.

use std::fmt;
use std::sync::{Arc, Mutex};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, trace};
use uuid::Uuid;

// ---

use mockconn_domain::{
    EndpointAddr, LinkConfig, LinkMetrics, LinkState, MockConnError, Result,
};

// ---

use super::cancel::{first_of, CancelSource};
use super::limiter::TokenBucket;
use super::metrics::MetricsRecorder;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One admitted message and the instant it passed the rate limiter.
struct Envelope {
    data: Vec<u8>,
    admitted_at: Instant,
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// Per-direction deadline state, resolved fresh on every blocking call.
#[derive(Debug, Clone, Copy)]
enum Deadline {
    /// Nothing set explicitly; the config default (if any) is re-armed
    /// relative to each call.
    Default,

    /// Explicitly cleared: no deadline at all, only terminal close.
    Never,

    /// Explicit absolute deadline; applies to every call until replaced.
    At(Instant),
}

impl Deadline {
    fn resolve(self, default_timeout: Option<Duration>) -> Option<Instant> {
        // ---
        match self {
            Deadline::Default => default_timeout.map(|timeout| Instant::now() + timeout),
            Deadline::Never => None,
            Deadline::At(at) => Some(at),
        }
    }
}

// ---------------------------------------------------------------------------
// PacerTask
// ---------------------------------------------------------------------------

/// Stage one: token-paced admission and the loss draw.
///
/// Token first, then dequeue — a message leaves its writer only when paced.
/// A lost message still spends its token: the packet left the sender and
/// died in the network.
struct PacerTask {
    // ---
    id: Uuid,
    admission_rx: mpsc::Receiver<Vec<u8>>,
    in_flight_tx: mpsc::Sender<Envelope>,
    bucket: TokenBucket,
    loss: f64,
    rng: SmallRng,
    close_write: CancelSource,
    metrics: Arc<MetricsRecorder>,
}

impl PacerTask {
    async fn run(mut self) {
        // ---
        loop {
            tokio::select! {
                _ = self.close_write.cancelled() => break,
                _ = self.bucket.acquire() => {}
            }

            let data = tokio::select! {
                _ = self.close_write.cancelled() => break,
                msg = self.admission_rx.recv() => match msg {
                    Some(data) => data,
                    // Link handle dropped with no writers left.
                    None => break,
                },
            };

            self.metrics.record_sent();

            if self.loss > 0.0 && self.rng.gen::<f64>() < self.loss {
                self.metrics.record_lost();
                trace!(id = %self.id, bytes = data.len(), "message lost");
                continue;
            }

            let envelope = Envelope {
                data,
                admitted_at: Instant::now(),
            };
            tokio::select! {
                _ = self.close_write.cancelled() => break,
                sent = self.in_flight_tx.send(envelope) => {
                    if sent.is_err() {
                        // Delay task exited: the read half closed under us.
                        break;
                    }
                }
            }
        }
        debug!(id = %self.id, "pacer task done");
        // Dropping admission_rx releases any parked writer with Closed.
    }
}

// ---------------------------------------------------------------------------
// DelayTask
// ---------------------------------------------------------------------------

/// Stage two: holds each message until `admitted_at + latency`.
struct DelayTask {
    // ---
    id: Uuid,
    in_flight_rx: mpsc::Receiver<Envelope>,
    delivery_tx: mpsc::Sender<Envelope>,
    latency: Duration,
    close_read: CancelSource,
}

impl DelayTask {
    async fn run(mut self) {
        // ---
        loop {
            let envelope = tokio::select! {
                _ = self.close_read.cancelled() => break,
                msg = self.in_flight_rx.recv() => match msg {
                    Some(envelope) => envelope,
                    // Pacer exited and the buffer drained.
                    None => break,
                },
            };

            // sleep_until on the admission stamp is monotonic: a message is
            // never handed over before admitted_at + latency, regardless of
            // how long the buffer held it.
            tokio::select! {
                _ = self.close_read.cancelled() => break,
                _ = sleep_until(envelope.admitted_at + self.latency) => {}
            }

            tokio::select! {
                _ = self.close_read.cancelled() => break,
                sent = self.delivery_tx.send(envelope) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(id = %self.id, "delay task done");
        // Dropping delivery_tx releases any parked reader with Closed.
    }
}

// ---------------------------------------------------------------------------
// UniLink
// ---------------------------------------------------------------------------

/// Reader-side state: the delivery receiver plus any residual suffix of a
/// message larger than the caller's buffer.
struct ReadHalf {
    delivery_rx: mpsc::Receiver<Envelope>,
    residual: Vec<u8>,
}

// ---

/// A unidirectional emulated link: writes enter at one end, reads drain the
/// other, with the configured throughput ceiling, one-way delay, and random
/// loss imposed in between.
///
/// One logical reader at a time; the internal mutex serializes accidental
/// concurrent readers rather than supporting them. Writers may be
/// concurrent.
pub struct UniLink {
    // ---
    id: Uuid,
    local: EndpointAddr,
    remote: EndpointAddr,
    write_timeout: Option<Duration>,
    read_timeout: Option<Duration>,

    admission_tx: mpsc::Sender<Vec<u8>>,
    read_half: tokio::sync::Mutex<ReadHalf>,

    write_deadline: Mutex<Deadline>,
    read_deadline: Mutex<Deadline>,

    close_write: CancelSource,
    close_read: CancelSource,

    metrics: Arc<MetricsRecorder>,
}

// ---

impl UniLink {
    // ---
    /// Build a link carrying messages from `addr1` to `addr2` and spawn its
    /// pipeline tasks. Must be called within a tokio runtime.
    pub fn new(config: &LinkConfig) -> Result<Self> {
        // ---
        config.validate()?;

        let id = Uuid::new_v4();
        let (admission_tx, admission_rx) = mpsc::channel(1);
        let (in_flight_tx, in_flight_rx) = mpsc::channel(config.effective_buffer());
        let (delivery_tx, delivery_rx) = mpsc::channel(1);

        let close_write = CancelSource::new();
        let close_read = CancelSource::new();
        let metrics = Arc::new(MetricsRecorder::default());

        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        debug!(
            %id,
            from = %config.addr1,
            to = %config.addr2,
            throughput = config.throughput,
            buffer = config.effective_buffer(),
            latency_ms = config.latency.as_millis() as u64,
            loss = config.loss,
            "link up",
        );

        tokio::spawn(
            PacerTask {
                id,
                admission_rx,
                in_flight_tx,
                bucket: TokenBucket::new(config.throughput),
                loss: config.loss,
                rng,
                close_write: close_write.clone(),
                metrics: metrics.clone(),
            }
            .run(),
        );
        tokio::spawn(
            DelayTask {
                id,
                in_flight_rx,
                delivery_tx,
                latency: config.latency,
                close_read: close_read.clone(),
            }
            .run(),
        );

        Ok(Self {
            id,
            local: EndpointAddr::new(config.addr1.clone()),
            remote: EndpointAddr::new(config.addr2.clone()),
            write_timeout: config.write_timeout,
            read_timeout: config.read_timeout,
            admission_tx,
            read_half: tokio::sync::Mutex::new(ReadHalf {
                delivery_rx,
                residual: Vec::new(),
            }),
            write_deadline: Mutex::new(Deadline::Default),
            read_deadline: Mutex::new(Deadline::Default),
            close_write,
            close_read,
            metrics,
        })
    }

    // ---

    /// Enqueue all of `buf` as one message.
    ///
    /// Blocks until the admission stage accepts it, the write half closes,
    /// or the applicable deadline elapses. Returns `buf.len()` on success.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        // ---
        if self.close_write.is_cancelled() {
            return Err(MockConnError::Closed);
        }
        if buf.is_empty() {
            return Err(MockConnError::ZeroLength);
        }

        let deadline = self
            .write_deadline
            .lock()
            .unwrap()
            .resolve(self.write_timeout);

        tokio::select! {
            biased;
            err = first_of(&self.close_write, deadline) => Err(err),
            sent = self.admission_tx.send(buf.to_vec()) => match sent {
                Ok(()) => Ok(buf.len()),
                Err(_) => Err(MockConnError::Closed),
            },
        }
    }

    // ---

    /// Read at least one byte whenever any is available, up to `buf.len()`.
    ///
    /// A suffix retained from a previous oversized message is returned
    /// first, even after `close_read`. Otherwise waits for the next
    /// delivered message, copies a prefix, and retains whatever does not
    /// fit for the next call.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        // ---
        let mut half = self.read_half.lock().await;

        if !half.residual.is_empty() {
            let n = buf.len().min(half.residual.len());
            buf[..n].copy_from_slice(&half.residual[..n]);
            half.residual.drain(..n);
            return Ok(n);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = self.read_deadline.lock().unwrap().resolve(self.read_timeout);

        let envelope = tokio::select! {
            biased;
            err = first_of(&self.close_read, deadline) => return Err(err),
            msg = half.delivery_rx.recv() => match msg {
                // Write half closed and the pipeline drained.
                None => return Err(MockConnError::Closed),
                Some(envelope) => envelope,
            },
        };

        self.metrics
            .record_delivered(envelope.admitted_at.elapsed());

        let n = buf.len().min(envelope.data.len());
        buf[..n].copy_from_slice(&envelope.data[..n]);
        if n < envelope.data.len() {
            half.residual.extend_from_slice(&envelope.data[n..]);
        }
        Ok(n)
    }

    // ---

    /// Shut the producer side. Idempotent; never blocks. Messages already
    /// past the rate limiter may still be delivered.
    pub fn close_write(&self) {
        self.close_write.cancel();
    }

    /// Shut the consumer side. Idempotent; never blocks. Stops further
    /// deliveries; residual bytes already handed toward the reader remain
    /// readable.
    pub fn close_read(&self) {
        self.close_read.cancel();
    }

    /// Shut both sides.
    pub fn close(&self) {
        self.close_write();
        self.close_read();
    }

    // ---

    /// Set or clear both deadlines at once.
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    /// Set or clear the absolute read deadline. `Some(t)` applies to every
    /// subsequent read until replaced — a `t` in the past fails them
    /// immediately. `None` clears it and also suppresses the configured
    /// default timeout.
    pub fn set_read_deadline(&self, deadline: Option<Instant>) {
        // ---
        *self.read_deadline.lock().unwrap() = match deadline {
            Some(at) => Deadline::At(at),
            None => Deadline::Never,
        };
    }

    /// Write-side twin of [`UniLink::set_read_deadline`].
    pub fn set_write_deadline(&self, deadline: Option<Instant>) {
        // ---
        *self.write_deadline.lock().unwrap() = match deadline {
            Some(at) => Deadline::At(at),
            None => Deadline::Never,
        };
    }

    // ---

    /// Label of the producing end.
    pub fn local_addr(&self) -> EndpointAddr {
        self.local.clone()
    }

    /// Label of the consuming end.
    pub fn remote_addr(&self) -> EndpointAddr {
        self.remote.clone()
    }

    /// Current half-close state.
    pub fn state(&self) -> LinkState {
        // ---
        match (
            self.close_write.is_cancelled(),
            self.close_read.is_cancelled(),
        ) {
            (false, false) => LinkState::Open,
            (true, false) => LinkState::WriteClosed,
            (false, true) => LinkState::ReadClosed,
            (true, true) => LinkState::Closed,
        }
    }

    pub(crate) fn is_write_closed(&self) -> bool {
        self.close_write.is_cancelled()
    }

    pub(crate) fn is_read_closed(&self) -> bool {
        self.close_read.is_cancelled()
    }

    /// Coherent, possibly stale counter snapshot. Never fails; reads zeros
    /// until the first event.
    pub fn snapshot_metrics(&self) -> LinkMetrics {
        self.metrics.snapshot()
    }
}

// ---

impl fmt::Display for UniLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link {} -> {}", self.local, self.remote)
    }
}

// ---

/// Free-function form of [`UniLink::new`].
pub fn new_uni_link(config: &LinkConfig) -> Result<UniLink> {
    UniLink::new(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
