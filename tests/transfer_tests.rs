//! Integration tests for the sliding-window transfer.
//!
//! Each test spins up endpoints talking over the loopback interface as
//! separate tokio tasks so they can make progress concurrently. Where the
//! protocol's wire behaviour itself is under test, one side is a scripted
//! plain UDP socket instead of the real implementation.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;

use rdt_over_udp::channel::{Channel, FaultProfile};
use rdt_over_udp::config::TransferConfig;
use rdt_over_udp::socket::Socket;
use rdt_over_udp::transfer::{Receiver, Sender};
use rdt_over_udp::wire::Segment;

/// Bind a socket to an OS-assigned port on loopback.
async fn ephemeral() -> Socket {
    let addr = "127.0.0.1:0".parse().unwrap();
    Socket::bind(addr).await.expect("bind failed")
}

fn payloads(n: u64) -> Vec<Vec<u8>> {
    (0..n).map(|i| format!("segment body {i}").into_bytes()).collect()
}

// ---------------------------------------------------------------------------
// Test 1: clean channel — no retransmissions, in-order delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_transfer_delivers_in_order_without_retransmission() {
    const N: u64 = 20;
    let cfg = TransferConfig {
        window_size: 5,
        segment_count: N,
        rto: Duration::from_secs(2),
        loss_probability: 0.0,
        corruption_probability: 0.0,
        ..Default::default()
    };

    let recv_channel = Channel::new(ephemeral().await, FaultProfile::receiver(&cfg));
    let recv_addr = recv_channel.local_addr();
    let (delivery_tx, mut delivery_rx) = mpsc::channel(64);
    let receiver = tokio::spawn(Receiver::new(recv_channel, delivery_tx).run());

    let send_channel = Channel::new(ephemeral().await, FaultProfile::sender(&cfg));
    let sender = Sender::new(send_channel, recv_addr, payloads(N), &cfg).expect("sender");
    let stats = sender.run().await.expect("transfer failed");

    // Exactly one transmission per segment, nothing resent.
    assert_eq!(stats.transmissions, N);
    assert_eq!(stats.retransmissions, 0);

    for expected in 0..N {
        let (seq, payload) = timeout(Duration::from_secs(1), delivery_rx.recv())
            .await
            .expect("delivery timed out")
            .expect("delivery channel closed early");
        assert_eq!(seq, expected);
        assert_eq!(payload, format!("segment body {expected}").into_bytes());
    }

    receiver.abort();
}

// ---------------------------------------------------------------------------
// Test 2: lossy channel — transfer still completes, still in order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lossy_transfer_completes_in_order() {
    const N: u64 = 30;
    let cfg = TransferConfig {
        window_size: 4,
        segment_count: N,
        rto: Duration::from_millis(100),
        max_retries: 50,
        loss_probability: 0.2,
        corruption_probability: 0.2,
    };

    let recv_channel =
        Channel::with_seed(ephemeral().await, FaultProfile::receiver(&cfg), 7);
    let recv_addr = recv_channel.local_addr();
    let (delivery_tx, mut delivery_rx) = mpsc::channel(64);
    let receiver = tokio::spawn(Receiver::new(recv_channel, delivery_tx).run());

    let send_channel = Channel::with_seed(ephemeral().await, FaultProfile::sender(&cfg), 11);
    let sender = Sender::new(send_channel, recv_addr, payloads(N), &cfg).expect("sender");
    let stats = timeout(Duration::from_secs(30), sender.run())
        .await
        .expect("transfer hung")
        .expect("transfer failed");

    // Something must have been lost and recovered at these fault rates.
    assert_eq!(stats.transmissions, N);

    let mut delivered = Vec::new();
    while delivered.len() < N as usize {
        let (seq, _) = timeout(Duration::from_secs(1), delivery_rx.recv())
            .await
            .expect("delivery timed out")
            .expect("delivery channel closed early");
        delivered.push(seq);
    }
    assert_eq!(delivered, (0..N).collect::<Vec<_>>());

    receiver.abort();
}

// ---------------------------------------------------------------------------
// Test 3: withheld ACKs — timeout retransmits the entire window
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timeout_retransmits_entire_window() {
    const N: u64 = 3;
    let cfg = TransferConfig {
        window_size: 3,
        segment_count: N,
        rto: Duration::from_millis(200),
        loss_probability: 0.0,
        corruption_probability: 0.0,
        ..Default::default()
    };

    // Scripted receiver: a plain UDP socket that withholds ACKs at first.
    let fake = UdpSocket::bind("127.0.0.1:0").await.expect("bind fake");
    let fake_addr = fake.local_addr().expect("fake addr");

    let send_channel = Channel::new(ephemeral().await, FaultProfile::sender(&cfg));
    let sender = Sender::new(send_channel, fake_addr, payloads(N), &cfg).expect("sender");
    let transfer = tokio::spawn(sender.run());

    async fn read_segment(sock: &UdpSocket) -> (Segment, SocketAddr) {
        let mut buf = [0u8; 2048];
        let (n, addr) = timeout(Duration::from_secs(2), sock.recv_from(&mut buf))
            .await
            .expect("no datagram before deadline")
            .expect("recv failed");
        (Segment::decode(&buf[..n]).expect("malformed segment"), addr)
    }

    // Initial fill: segments 0..3 in order.
    let mut sender_addr = None;
    for expected in 0..N {
        let (segment, addr) = read_segment(&fake).await;
        assert_eq!(segment.seq, expected);
        sender_addr = Some(addr);
    }
    let sender_addr = sender_addr.unwrap();

    // No ACKs sent: the retransmission timer must fire and the next batch
    // must be the entire window [base, next_seq), in order.
    for expected in 0..N {
        let (segment, _) = read_segment(&fake).await;
        assert_eq!(
            segment.seq, expected,
            "go-back-n must resend the whole window in order"
        );
    }

    // Acknowledge everything; the sender must now terminate.
    fake.send_to(b"2", sender_addr).await.expect("send ack");
    let stats = timeout(Duration::from_secs(2), transfer)
        .await
        .expect("sender did not terminate after final ACK")
        .expect("join failed")
        .expect("transfer failed");

    assert_eq!(stats.transmissions, N);
    assert!(stats.retransmissions >= N, "full window retransmitted at least once");
}

// ---------------------------------------------------------------------------
// Test 4: receiver ACK discipline on the wire
// ---------------------------------------------------------------------------

#[tokio::test]
async fn receiver_ack_discipline() {
    let cfg = TransferConfig {
        corruption_probability: 0.0,
        ..Default::default()
    };
    let recv_channel = Channel::new(ephemeral().await, FaultProfile::receiver(&cfg));
    let recv_addr = recv_channel.local_addr();
    let (delivery_tx, mut delivery_rx) = mpsc::channel(64);
    let receiver = tokio::spawn(Receiver::new(recv_channel, delivery_tx).run());

    let probe = UdpSocket::bind("127.0.0.1:0").await.expect("bind probe");

    async fn expect_ack(sock: &UdpSocket, want: &[u8]) {
        let mut buf = [0u8; 64];
        let (n, _) = timeout(Duration::from_secs(1), sock.recv_from(&mut buf))
            .await
            .expect("expected an ACK")
            .expect("recv failed");
        assert_eq!(&buf[..n], want);
    }

    // Malformed datagram: silently dropped, no ACK at all.
    probe.send_to(b"garbage", recv_addr).await.expect("send");
    let mut buf = [0u8; 64];
    assert!(
        timeout(Duration::from_millis(200), probe.recv_from(&mut buf))
            .await
            .is_err(),
        "malformed datagram must not be acknowledged"
    );

    // Early segment: buffered, ACK is still "nothing delivered yet".
    probe.send_to(b"2:third", recv_addr).await.expect("send");
    expect_ack(&probe, b"-1").await;

    // In-order segment delivers and advances the cumulative ACK.
    probe.send_to(b"0:first", recv_addr).await.expect("send");
    expect_ack(&probe, b"0").await;

    // Duplicate of delivered data: discarded but still acknowledged.
    probe.send_to(b"0:first", recv_addr).await.expect("send");
    expect_ack(&probe, b"0").await;

    // Gap fill: delivers 1 and the buffered 2 in one step.
    probe.send_to(b"1:second", recv_addr).await.expect("send");
    expect_ack(&probe, b"2").await;

    let mut delivered = Vec::new();
    for _ in 0..3 {
        let (seq, payload) = timeout(Duration::from_secs(1), delivery_rx.recv())
            .await
            .expect("delivery timed out")
            .expect("delivery channel closed early");
        delivered.push((seq, payload));
    }
    assert_eq!(
        delivered,
        vec![
            (0, b"first".to_vec()),
            (1, b"second".to_vec()),
            (2, b"third".to_vec()),
        ]
    );

    receiver.abort();
}
