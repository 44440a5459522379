//! The duplex endpoint: two unidirectional links under one byte-stream face.

use std::fmt;
use std::sync::{Arc, RwLock};

use tokio::time::Instant;

// ---

use mockconn_domain::{EndpointAddr, LinkConfig, LinkMetrics, MockConnError, Result};

// ---

use super::uni::UniLink;

// ---------------------------------------------------------------------------
// MockConn
// ---------------------------------------------------------------------------

/// One endpoint of an emulated connection, presenting a reliable
/// byte-stream surface.
///
/// Writes go out on the send link; reads come off the recv link. The paired
/// endpoint holds the same two links in the opposite orientation, so one
/// side's writes appear on the other side's reads. Created in pairs by
/// [`MockConn::pair`].
pub struct MockConn {
    // ---
    send_link: Option<Arc<UniLink>>,
    recv_link: Option<Arc<UniLink>>,

    // Pause is a transient reject of new calls, independent of close.
    pause_read: RwLock<bool>,
    pause_write: RwLock<bool>,
}

// ---

impl MockConn {
    // ---
    /// Create both endpoints of a connection with the given impairments.
    ///
    /// Spawns the pipeline tasks of both directions; call within a tokio
    /// runtime.
    pub fn pair(config: &LinkConfig) -> Result<(MockConn, MockConn)> {
        // ---
        let forward = Arc::new(UniLink::new(config)?);
        let reverse = Arc::new(UniLink::new(&config.reversed())?);

        let first = MockConn::established(forward.clone(), reverse.clone());
        let second = MockConn::established(reverse, forward);
        Ok((first, second))
    }

    /// An endpoint with no links attached; every operation fails with
    /// [`MockConnError::NotEstablished`]. A placeholder for wiring code
    /// that attaches endpoints later.
    pub fn unestablished() -> MockConn {
        // ---
        MockConn {
            send_link: None,
            recv_link: None,
            pause_read: RwLock::new(false),
            pause_write: RwLock::new(false),
        }
    }

    fn established(send_link: Arc<UniLink>, recv_link: Arc<UniLink>) -> MockConn {
        // ---
        MockConn {
            send_link: Some(send_link),
            recv_link: Some(recv_link),
            pause_read: RwLock::new(false),
            pause_write: RwLock::new(false),
        }
    }

    // ---

    fn send_link(&self) -> Result<&Arc<UniLink>> {
        self.send_link.as_ref().ok_or(MockConnError::NotEstablished)
    }

    fn recv_link(&self) -> Result<&Arc<UniLink>> {
        self.recv_link.as_ref().ok_or(MockConnError::NotEstablished)
    }

    // ---

    /// Enqueue all of `buf` as one outbound message. Returns `buf.len()`
    /// on success.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        // ---
        let link = self.send_link()?;
        if *self.pause_write.read().unwrap() {
            // Terminal state wins over the transient pause.
            if link.is_write_closed() {
                return Err(MockConnError::Closed);
            }
            return Err(MockConnError::Paused);
        }
        link.write(buf).await
    }

    /// Read at least one byte whenever any is available, up to `buf.len()`.
    /// An oversized message is split; its suffix comes back on subsequent
    /// reads.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        // ---
        let link = self.recv_link()?;
        if *self.pause_read.read().unwrap() {
            if link.is_read_closed() {
                return Err(MockConnError::Closed);
            }
            return Err(MockConnError::Paused);
        }
        link.read(buf).await
    }

    // ---

    /// Shut the write half of the outbound direction and the read half of
    /// the inbound direction. Idempotent; never blocks.
    pub fn close(&self) -> Result<()> {
        // ---
        let send = self.send_link()?;
        let recv = self.recv_link()?;
        send.close_write();
        recv.close_read();
        Ok(())
    }

    /// Shut only the inbound read half.
    pub fn close_read(&self) -> Result<()> {
        self.recv_link()?.close_read();
        Ok(())
    }

    /// Shut only the outbound write half.
    pub fn close_write(&self) -> Result<()> {
        self.send_link()?.close_write();
        Ok(())
    }

    // ---

    /// Set or clear the deadline for both directions. `Some(t)` is an
    /// absolute instant applying to every subsequent call until replaced;
    /// `None` clears the deadline (including any configured default),
    /// leaving only terminal-close cancellation in force.
    pub fn set_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        // ---
        self.send_link()?.set_write_deadline(deadline);
        self.recv_link()?.set_read_deadline(deadline);
        Ok(())
    }

    /// Set or clear the read deadline.
    pub fn set_read_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.recv_link()?.set_read_deadline(deadline);
        Ok(())
    }

    /// Set or clear the write deadline.
    pub fn set_write_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        self.send_link()?.set_write_deadline(deadline);
        Ok(())
    }

    // ---

    /// Address of this endpoint.
    pub fn local_addr(&self) -> Result<EndpointAddr> {
        Ok(self.send_link()?.local_addr())
    }

    /// Address of the paired endpoint.
    pub fn remote_addr(&self) -> Result<EndpointAddr> {
        Ok(self.send_link()?.remote_addr())
    }

    // ---

    /// Reject subsequent reads with [`MockConnError::Paused`] until
    /// [`MockConn::resume_read`]. Data in flight keeps moving through the
    /// pipeline.
    pub fn pause_read(&self) {
        *self.pause_read.write().unwrap() = true;
    }

    /// Re-enable reads.
    pub fn resume_read(&self) {
        *self.pause_read.write().unwrap() = false;
    }

    /// Reject subsequent writes with [`MockConnError::Paused`] until
    /// [`MockConn::resume_write`].
    pub fn pause_write(&self) {
        *self.pause_write.write().unwrap() = true;
    }

    /// Re-enable writes.
    pub fn resume_write(&self) {
        *self.pause_write.write().unwrap() = false;
    }

    // ---

    /// Counters for the direction this endpoint reads from.
    pub fn snapshot_metrics(&self) -> Result<LinkMetrics> {
        Ok(self.recv_link()?.snapshot_metrics())
    }
}

// ---

impl fmt::Display for MockConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        match &self.send_link {
            Some(link) => write!(f, "endpoint {}", link.local_addr()),
            None => f.write_str("endpoint (not established)"),
        }
    }
}

// ---

/// Free-function form of [`MockConn::pair`].
pub fn new_pair(config: &LinkConfig) -> Result<(MockConn, MockConn)> {
    MockConn::pair(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
