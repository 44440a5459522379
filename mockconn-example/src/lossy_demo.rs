//! Lossy link demo — pushes a burst of packets across a satellite-profile
//! link with 5 % loss and prints the delivery counters.

use std::time::Duration;

// ---

use mockconn_domain::LinkConfig;
use mockconn_link::MockConn;

// ---

pub async fn run(seed: Option<u64>) -> anyhow::Result<()> {
    // ---
    let config = LinkConfig {
        addr1: "uplink".into(),
        addr2: "downlink".into(),
        loss: 0.05,
        seed,
        ..LinkConfig::satellite()
    };
    let latency = config.latency;
    let (tx_end, rx_end) = MockConn::pair(&config)?;

    let reader = tokio::spawn(async move {
        // ---
        let mut delivered = 0u64;
        let mut packet = [0u8; 256];
        while rx_end.read(&mut packet).await.is_ok() {
            delivered += 1;
        }
        (rx_end, delivered)
    });

    let total = 64u64;
    for seq in 1..=total {
        let mut packet = [0u8; 256];
        packet[..8].copy_from_slice(&seq.to_le_bytes());
        tx_end.write(&packet).await?;
    }

    // Let the tail of the burst clear the delay stage before ending the
    // stream.
    tokio::time::sleep(latency + Duration::from_millis(200)).await;
    tx_end.close_write()?;

    let (rx_end, delivered) = reader.await?;
    let metrics = rx_end.snapshot_metrics()?;
    println!("  wrote {total} packets, {delivered} made it across");
    println!("  downlink metrics: {metrics}");
    Ok(())
}
