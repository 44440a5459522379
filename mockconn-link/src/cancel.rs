//! Cancellation plumbing for blocking link operations.
//!
//! Every blocking call on a link observes two signals: the terminal close
//! signal for that half and the call's optional absolute deadline.
//! [`CancelSource`] is the close trip wire; [`first_of`] is the composition
//! the operations select over, resolving to whichever signal fires first.

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use mockconn_domain::MockConnError;

// ---------------------------------------------------------------------------
// CancelSource
// ---------------------------------------------------------------------------

/// One-shot close trip wire for one half of a link.
///
/// Clones share the same wire. Tripping is idempotent and never blocks;
/// waiters wake within one scheduler pass. Operations that observe the trip
/// surface it as [`MockConnError::Closed`] via [`first_of`]; the pipeline
/// tasks just exit.
#[derive(Debug, Clone)]
pub(crate) struct CancelSource {
    // ---
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

// ---

impl CancelSource {
    // ---
    pub(crate) fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    // ---

    /// Trip the wire. Idempotent; never blocks.
    pub(crate) fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Has the wire been tripped?
    pub(crate) fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the wire is tripped. Resolves immediately if already
    /// tripped.
    pub(crate) async fn cancelled(&self) {
        // ---
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Every sender clone is gone without tripping; the wire can
                // never fire now.
                std::future::pending::<()>().await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// first_of
// ---------------------------------------------------------------------------

/// Wait for whichever fires first: the terminal close signal (surfaced as
/// [`MockConnError::Closed`]) or the optional absolute deadline (surfaced
/// as [`MockConnError::DeadlineExceeded`]). Pends forever when the deadline
/// is `None` and the signal stays untripped. The terminal signal wins a
/// tie.
pub(crate) async fn first_of(close: &CancelSource, deadline: Option<Instant>) -> MockConnError {
    // ---
    tokio::select! {
        biased;
        _ = close.cancelled() => MockConnError::Closed,
        _ = deadline_elapsed(deadline) => MockConnError::DeadlineExceeded,
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
