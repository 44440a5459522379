//! In-process network-connection emulator.
//!
//! [`MockConn::pair`] returns two endpoint handles that behave as a reliable
//! byte-stream connection while a configured throughput ceiling, a fixed
//! one-way propagation delay, and an independent random loss rate are
//! imposed on each direction of travel. No real sockets are involved; tests
//! and simulations use the pair to exercise networked code against
//! controlled adverse conditions.
//!
//! Each direction is a [`UniLink`]: a rate-limited admission stage and a
//! latency-delay stage joined by a bounded in-flight buffer, which is where
//! backpressure, loss, deadlines, and half-close live.
//!
//! # Quick start
//!
//! ```rust
//! use mockconn_domain::LinkConfig;
//! use mockconn_link::MockConn;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> mockconn_domain::Result<()> {
//! let (alice, bob) = MockConn::pair(&LinkConfig::perfect())?;
//!
//! alice.write(b"ping").await?;
//! let mut buf = [0u8; 16];
//! let n = bob.read(&mut buf).await?;
//! assert_eq!(&buf[..n], b"ping");
//! # Ok(()) }
//! ```

mod cancel;
mod conn;
mod limiter;
mod metrics;
mod uni;

// --- public API
pub use conn::{new_pair, MockConn};
pub use uni::{new_uni_link, UniLink};
