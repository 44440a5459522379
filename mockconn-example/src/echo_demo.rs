//! Bidirectional echo demo — a client sends sequenced packets across an
//! emulated link, the far endpoint echoes them straight back, and the
//! client verifies order on the return leg.

use std::time::Duration;

use tokio::time::Instant;

// ---

use mockconn_domain::LinkConfig;
use mockconn_link::MockConn;

// ---

const PACKET: usize = 64;

// ---

pub async fn run() -> anyhow::Result<()> {
    // ---
    let config = LinkConfig {
        addr1: "client".into(),
        addr2: "echo-server".into(),
        throughput: 256,
        latency: Duration::from_millis(100),
        ..LinkConfig::default()
    };
    let (client, server) = MockConn::pair(&config)?;

    // Echo loop on the far side: read a packet, write it straight back.
    let server_task = tokio::spawn(async move {
        // ---
        let mut packet = [0u8; PACKET];
        loop {
            let n = match server.read(&mut packet).await {
                Ok(n) => n,
                Err(_) => break,
            };
            if server.write(&packet[..n]).await.is_err() {
                break;
            }
        }
    });

    let rounds = 10u64;
    let start = Instant::now();
    for seq in 1..=rounds {
        let mut packet = [0u8; PACKET];
        packet[..8].copy_from_slice(&seq.to_le_bytes());
        client.write(&packet).await?;
    }

    let mut echoed = Vec::new();
    let mut packet = [0u8; PACKET];
    for _ in 0..rounds {
        let n = client.read(&mut packet).await?;
        anyhow::ensure!(n == PACKET, "short echo read: {n} bytes");
        echoed.push(u64::from_le_bytes(packet[..8].try_into()?));
    }
    let elapsed = start.elapsed();

    anyhow::ensure!(
        echoed == (1..=rounds).collect::<Vec<_>>(),
        "echo order broken: {echoed:?}"
    );
    println!(
        "  {rounds} packets echoed in order over {} <-> {}, wall time {elapsed:?}",
        client.local_addr()?,
        client.remote_addr()?,
    );

    client.close()?;
    server_task.await?;
    Ok(())
}
