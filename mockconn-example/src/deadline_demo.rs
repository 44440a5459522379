//! Read-deadline demo — arms a one-second deadline on an idle link and
//! shows the read failing cleanly instead of blocking forever.

use std::time::Duration;

use tokio::time::Instant;

// ---

use mockconn_domain::{LinkConfig, MockConnError};
use mockconn_link::MockConn;

// ---

pub async fn run() -> anyhow::Result<()> {
    // ---
    let (alice, _bob) = MockConn::pair(&LinkConfig::perfect())?;

    alice.set_read_deadline(Some(Instant::now() + Duration::from_secs(1)))?;

    let start = Instant::now();
    let mut packet = [0u8; 16];
    match alice.read(&mut packet).await {
        Err(MockConnError::DeadlineExceeded) => {
            println!(
                "  idle read gave up with a deadline error after {:?}",
                start.elapsed()
            );
        }
        other => anyhow::bail!("expected a deadline error, got {other:?}"),
    }
    Ok(())
}
