//! End-to-end scenarios for the emulated connection: ordering, pacing,
//! latency floors, loss accounting, deadlines, half-close, and
//! backpressure, all driven through the public endpoint surface.
//!
//! Timing-sensitive cases run under the paused clock so virtual time keeps
//! them exact without slowing the suite down.

use std::sync::Arc;
use std::time::Duration;

use mockconn_domain::{LinkConfig, MockConnError};
use mockconn_link::MockConn;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

const PACKET: usize = 1024;

fn config(throughput: u32, latency_ms: u64) -> LinkConfig {
    // ---
    LinkConfig {
        addr1: "alice".into(),
        addr2: "bob".into(),
        throughput,
        latency: Duration::from_millis(latency_ms),
        ..LinkConfig::default()
    }
}

/// Write `count` fixed-size packets, each carrying its 1-based sequence
/// number in the first eight bytes. Returns the sequences actually written.
async fn write_packets(conn: &MockConn, count: u64) -> Vec<u64> {
    // ---
    let mut sent = Vec::new();
    for seq in 1..=count {
        let mut packet = [0u8; PACKET];
        packet[..8].copy_from_slice(&seq.to_le_bytes());
        if conn.write(&packet).await.is_err() {
            break;
        }
        sent.push(seq);
    }
    sent
}

/// Read up to `limit` packets, decoding the sequence number of each.
/// Stops early on any error (loss shrinks the stream; close ends it).
async fn read_packets(conn: &MockConn, limit: u64) -> Vec<u64> {
    // ---
    let mut received = Vec::new();
    let mut packet = [0u8; PACKET];
    for _ in 0..limit {
        match conn.read(&mut packet).await {
            Ok(n) => {
                assert_eq!(n, PACKET, "packet boundary split unexpectedly");
                received.push(u64::from_le_bytes(packet[..8].try_into().unwrap()));
            }
            Err(_) => break,
        }
    }
    received
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn bidirectional_echo_preserves_sequences() {
    // ---
    let (alice, bob) = MockConn::pair(&config(256, 100)).unwrap();
    let (alice, bob) = (Arc::new(alice), Arc::new(bob));

    // Forward leg: 100 packets alice -> bob.
    let writer = tokio::spawn({
        let alice = alice.clone();
        async move { write_packets(&alice, 100).await }
    });
    let reader = tokio::spawn({
        let bob = bob.clone();
        async move { read_packets(&bob, 100).await }
    });

    let sent = writer.await.unwrap();
    let received = reader.await.unwrap();
    assert_eq!(sent, (1..=100).collect::<Vec<_>>());
    assert_eq!(received, sent, "forward leg reordered or dropped");

    // Reverse leg: 50 packets bob -> alice, over the same pair.
    let writer = tokio::spawn({
        let bob = bob.clone();
        async move { write_packets(&bob, 50).await }
    });
    let reader = tokio::spawn({
        let alice = alice.clone();
        async move { read_packets(&alice, 50).await }
    });

    let sent = writer.await.unwrap();
    let received = reader.await.unwrap();
    assert_eq!(sent, (1..=50).collect::<Vec<_>>());
    assert_eq!(received, sent, "reverse leg reordered or dropped");
}

// ---------------------------------------------------------------------------
// Pacing and latency
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn low_throughput_paces_the_stream() {
    // ---
    let count = 256u64;
    let throughput = 16u32;
    let (alice, bob) = MockConn::pair(&config(throughput, 20)).unwrap();
    let alice = Arc::new(alice);

    let start = Instant::now();
    let writer = tokio::spawn({
        let alice = alice.clone();
        async move { write_packets(&alice, count).await }
    });
    let received = read_packets(&bob, count).await;
    writer.await.unwrap();

    assert_eq!(received, (1..=count).collect::<Vec<_>>());

    // One-token burst aside, N messages cannot beat (N-1)/T.
    let floor = Duration::from_secs_f64((count - 1) as f64 / f64::from(throughput));
    assert!(
        start.elapsed() >= floor,
        "{count} packets took {:?}, expected at least {floor:?}",
        start.elapsed(),
    );
}

#[tokio::test(start_paused = true)]
async fn latency_holds_back_the_first_delivery() {
    // ---
    let (alice, bob) = MockConn::pair(&config(128, 500)).unwrap();
    let alice = Arc::new(alice);

    let start = Instant::now();
    let writer = tokio::spawn({
        let alice = alice.clone();
        async move { write_packets(&alice, 64).await }
    });

    let mut packet = [0u8; PACKET];
    bob.read(&mut packet).await.unwrap();
    assert!(
        start.elapsed() >= Duration::from_millis(500),
        "first packet arrived after only {:?}",
        start.elapsed(),
    );
    assert_eq!(u64::from_le_bytes(packet[..8].try_into().unwrap()), 1);

    let rest = read_packets(&bob, 63).await;
    assert_eq!(rest, (2..=64).collect::<Vec<_>>());
    writer.await.unwrap();

    assert!(bob.snapshot_metrics().unwrap().avg_latency >= Duration::from_millis(500));
}

// ---------------------------------------------------------------------------
// Loss
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn lossy_link_accounts_for_every_message() {
    // ---
    let count = 256u64;
    let link_config = LinkConfig {
        loss: 0.01,
        seed: Some(0xDEAD_BEEF_CAFE_1234),
        ..config(128, 20)
    };
    let (alice, bob) = MockConn::pair(&link_config).unwrap();
    let (alice, bob) = (Arc::new(alice), Arc::new(bob));

    let reader = tokio::spawn({
        let bob = bob.clone();
        async move { read_packets(&bob, count).await }
    });

    let sent = write_packets(&alice, count).await;
    assert_eq!(sent.len() as u64, count);

    // Let the pipeline finish pacing and draining, then end the stream so
    // the reader sees a clean close instead of waiting for lost packets.
    tokio::time::sleep(Duration::from_secs(5)).await;
    alice.close_write().unwrap();

    let received = reader.await.unwrap();
    assert!(
        received.len() >= 240 && received.len() <= count as usize,
        "implausible delivery count {} at 1% loss",
        received.len(),
    );
    assert!(
        received.windows(2).all(|pair| pair[0] < pair[1]),
        "survivors arrived out of order",
    );

    let metrics = bob.snapshot_metrics().unwrap();
    assert_eq!(metrics.sent, count);
    assert_eq!(metrics.delivered as usize, received.len());
    assert_eq!(metrics.lost + metrics.delivered, metrics.sent);
    assert!(metrics.avg_latency >= Duration::from_millis(20));
}

// ---------------------------------------------------------------------------
// Deadlines
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn read_deadline_fires_on_an_idle_connection() {
    // ---
    let (_alice, bob) = MockConn::pair(&config(1024, 0)).unwrap();

    bob.set_read_deadline(Some(Instant::now() + Duration::from_secs(1)))
        .unwrap();

    let start = Instant::now();
    let mut packet = [0u8; PACKET];
    assert_eq!(
        bob.read(&mut packet).await.unwrap_err(),
        MockConnError::DeadlineExceeded
    );
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(start.elapsed() < Duration::from_millis(1100));
}

// ---------------------------------------------------------------------------
// Half-close
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn close_read_stops_a_streaming_writer() {
    // ---
    let (alice, bob) = MockConn::pair(&config(256, 10)).unwrap();
    let alice = Arc::new(alice);

    // Writer streams continuously until the link pushes back.
    let writer = tokio::spawn({
        let alice = alice.clone();
        async move {
            for seq in 1..=1000u64 {
                let mut packet = [0u8; PACKET];
                packet[..8].copy_from_slice(&seq.to_le_bytes());
                if let Err(err) = alice.write(&packet).await {
                    return (seq - 1, err);
                }
            }
            panic!("writer streamed 1000 packets past a closed reader");
        }
    });

    let received = read_packets(&bob, 101).await;
    assert_eq!(received, (1..=101).collect::<Vec<_>>());

    bob.close_read().unwrap();
    let mut packet = [0u8; PACKET];
    assert_eq!(
        bob.read(&mut packet).await.unwrap_err(),
        MockConnError::Closed
    );

    let (written, err) = writer.await.unwrap();
    assert_eq!(err, MockConnError::Closed);
    assert!(
        written < 1000,
        "writer never observed the read-side close",
    );
}

#[tokio::test(start_paused = true)]
async fn reader_drains_messages_admitted_before_close_write() {
    // ---
    let (alice, bob) = MockConn::pair(&config(1024, 0)).unwrap();

    for seq in 1..=3u64 {
        let mut packet = [0u8; PACKET];
        packet[..8].copy_from_slice(&seq.to_le_bytes());
        alice.write(&packet).await.unwrap();
    }

    // All three are past the rate limiter once the pacing window elapses.
    tokio::time::sleep(Duration::from_secs(1)).await;
    alice.close_write().unwrap();

    let received = read_packets(&bob, 10).await;
    assert_eq!(received, vec![1, 2, 3]);
    let mut packet = [0u8; PACKET];
    assert_eq!(
        bob.read(&mut packet).await.unwrap_err(),
        MockConnError::Closed
    );
}

#[tokio::test]
async fn closes_are_idempotent_at_the_endpoint() {
    // ---
    let (alice, bob) = MockConn::pair(&config(1024, 0)).unwrap();

    alice.close().unwrap();
    alice.close().unwrap();
    alice.close_write().unwrap();
    bob.close_read().unwrap();
    bob.close_read().unwrap();

    assert_eq!(
        alice.write(b"x").await.unwrap_err(),
        MockConnError::Closed
    );
    let mut buf = [0u8; 8];
    assert_eq!(
        bob.read(&mut buf).await.unwrap_err(),
        MockConnError::Closed
    );
}

// ---------------------------------------------------------------------------
// Backpressure
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn full_buffer_blocks_the_writer_until_the_reader_drains() {
    // ---
    let buffer = 4usize;
    let link_config = LinkConfig {
        buffer_size: buffer,
        ..config(1024, 0)
    };
    let (alice, bob) = MockConn::pair(&link_config).unwrap();
    let alice = Arc::new(alice);

    let total = 16u64;
    let writer = tokio::spawn({
        let alice = alice.clone();
        async move { write_packets(&alice, total).await }
    });

    // With no reader the writer must wedge: the buffer plus the pipeline's
    // in-hand slots bound how far it can run ahead.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(
        !writer.is_finished(),
        "writer ran {total} packets past a {buffer}-slot buffer with no reader",
    );

    // Draining unblocks it.
    let received = read_packets(&bob, total).await;
    assert_eq!(received, (1..=total).collect::<Vec<_>>());
    let sent = writer.await.unwrap();
    assert_eq!(sent.len() as u64, total);
}
