//! Transfer orchestration: the sender run loop, its ACK listener, and the
//! receiver run loop.
//!
//! # Sender concurrency
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            │  Arc<Mutex<SenderState>>                     │
//!            │  (window bounds, retransmit timer, retries)  │
//!            └───────▲──────────────▲──────────────▲────────┘
//!                    │              │              │
//!        initial fill_window   ACK listener   timer fire task
//!        (run entry)           (bounded wait  (sleep → lock →
//!                              = RTO; elapsed  epoch check →
//!                              wait synthesizes handle_timeout)
//!                              a timeout event)
//! ```
//!
//! Three execution units touch the shared state and every state transition
//! happens under the one `tokio::sync::Mutex`. The lock is never held
//! across the blocking ACK wait; it is held across the short, non-blocking
//! UDP sends a transition performs. Both the elapsed ACK wait and the timer
//! task funnel into the single authoritative [`Sender::handle_timeout`];
//! the lock plus the timer epoch keep a cancelled fire from acting, and a
//! same-expiry double trigger is collapsed by a freshness check.
//!
//! The receiver is one loop with no internal concurrency: receive, parse,
//! reassemble, deliver downstream, acknowledge.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout, Instant};

use crate::channel::Channel;
use crate::config::TransferConfig;
use crate::receiver::{Arrival, Reassembler};
use crate::sender::{AckOutcome, SenderWindow};
use crate::timer::RetransmitTimer;
use crate::wire::{self, Segment};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that terminate a transfer.
///
/// Protocol-level anomalies (loss, corruption, duplication, reordering) are
/// recovered internally and never appear here.
#[derive(Debug)]
pub enum TransferError {
    /// Fatal fault on the underlying socket.
    Socket(io::Error),
    /// The sender hit the cap on consecutive timeouts without progress.
    MaxRetriesExceeded,
    /// Rejected configuration (see [`TransferConfig::validate`]).
    Config(String),
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Socket(e) => write!(f, "socket error: {e}"),
            Self::MaxRetriesExceeded => write!(f, "no ACK progress within the retry limit"),
            Self::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<io::Error> for TransferError {
    fn from(e: io::Error) -> Self {
        Self::Socket(e)
    }
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Counters reported by a completed send.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    /// First transmissions handed to the channel (simulated drops included).
    pub transmissions: u64,
    /// Go-Back-N retransmissions handed to the channel.
    pub retransmissions: u64,
}

/// Shared mutable sender state; every access goes through the one lock.
struct SenderState {
    window: SenderWindow,
    timer: RetransmitTimer,
    /// Consecutive timeouts since the window last advanced.
    retries: u32,
    /// When the last timeout action ran, for collapsing double triggers.
    last_timeout: Option<Instant>,
    /// Fatal error raised by the timer task, picked up by the ACK listener.
    failed: Option<TransferError>,
    transmissions: u64,
    retransmissions: u64,
}

/// Sending endpoint of one reliable transfer.
///
/// Owns the full ordered payload sequence up front; the transfer is done
/// when every segment has been cumulatively acknowledged.
#[derive(Clone)]
pub struct Sender {
    shared: Arc<Mutex<SenderState>>,
    channel: Arc<Channel>,
    peer: SocketAddr,
    rto: Duration,
    max_retries: u32,
    payloads: Arc<Vec<Vec<u8>>>,
}

impl Sender {
    /// Create a sender that will deliver `payloads` (one segment each, in
    /// order) to `peer` through `channel`.
    pub fn new(
        channel: Channel,
        peer: SocketAddr,
        payloads: Vec<Vec<u8>>,
        cfg: &TransferConfig,
    ) -> Result<Self, TransferError> {
        cfg.validate().map_err(TransferError::Config)?;
        let window = SenderWindow::new(cfg.window_size, payloads.len() as u64);
        Ok(Self {
            shared: Arc::new(Mutex::new(SenderState {
                window,
                timer: RetransmitTimer::new(),
                retries: 0,
                last_timeout: None,
                failed: None,
                transmissions: 0,
                retransmissions: 0,
            })),
            channel: Arc::new(channel),
            peer,
            rto: cfg.rto,
            max_retries: cfg.max_retries,
            payloads: Arc::new(payloads),
        })
    }

    /// Run the transfer to completion.
    ///
    /// Fills the initial window, then listens for ACKs (with the RTO as the
    /// bounded wait), retransmitting the outstanding window on every
    /// timeout. Returns once every segment is acknowledged, or with an
    /// error on a socket fault or when `max_retries` consecutive timeouts
    /// pass without progress.
    pub async fn run(self) -> Result<TransferStats, TransferError> {
        {
            let mut st = self.shared.lock().await;
            if st.window.is_complete() {
                return Ok(TransferStats::default()); // zero-segment transfer
            }
            log::info!(
                "[sender] starting transfer of {} segment(s) to {}",
                self.payloads.len(),
                self.peer
            );
            self.fill_window(&mut st).await?;
        }

        let result = self.ack_loop().await;

        let mut st = self.shared.lock().await;
        st.timer.cancel();
        let stats = TransferStats {
            transmissions: st.transmissions,
            retransmissions: st.retransmissions,
        };
        result.map(|()| {
            log::info!(
                "[sender] transfer complete: {} segment(s), {} retransmission(s)",
                stats.transmissions,
                stats.retransmissions
            );
            stats
        })
    }

    /// Perpetual ACK listener: blocks on datagram arrival with a bounded
    /// wait equal to the RTO; an elapsed wait synthesizes a local timeout
    /// event instead of being treated as a received message.
    async fn ack_loop(&self) -> Result<(), TransferError> {
        loop {
            match timeout(self.rto, self.channel.recv_from()).await {
                Ok(Ok(Some((buf, from)))) => {
                    if from != self.peer {
                        continue;
                    }
                    let ack = match wire::decode_ack(&buf) {
                        Ok(ack) => ack,
                        Err(e) => {
                            log::debug!("[sender] malformed ACK ignored: {e}");
                            continue;
                        }
                    };

                    let mut st = self.shared.lock().await;
                    if let Some(err) = st.failed.take() {
                        st.timer.cancel();
                        return Err(err);
                    }
                    match st.window.on_ack(ack) {
                        AckOutcome::Complete => {
                            st.timer.cancel();
                            log::debug!("[sender] ← ACK {} — all segments acknowledged", fmt_ack(ack));
                            return Ok(());
                        }
                        AckOutcome::Advanced => {
                            st.timer.cancel();
                            st.retries = 0;
                            log::debug!(
                                "[sender] ← ACK {} base={}",
                                fmt_ack(ack),
                                st.window.base()
                            );
                            self.fill_window(&mut st).await?;
                        }
                        AckOutcome::Stale => {
                            log::debug!(
                                "[sender] ← stale ACK {} (base={})",
                                fmt_ack(ack),
                                st.window.base()
                            );
                        }
                    }
                }
                // Datagram discarded by the channel's corruption trial.
                Ok(Ok(None)) => continue,
                Ok(Err(e)) => return Err(TransferError::Socket(e)),
                Err(_elapsed) => {
                    let mut st = self.shared.lock().await;
                    if let Some(err) = st.failed.take() {
                        st.timer.cancel();
                        return Err(err);
                    }
                    self.handle_timeout(&mut st).await;
                    if let Some(err) = st.failed.take() {
                        st.timer.cancel();
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Transmit every eligible new segment: while the window has room and
    /// unsent segments remain, hand the next one to the channel and advance
    /// `next_seq` — whether or not the channel simulated a drop, because
    /// the sender cannot observe drops.
    ///
    /// Re-entrant-safe with respect to the window bounds; invoked with the
    /// shared lock held, from the run entry, [`on_ack`](Self::ack_loop),
    /// and [`handle_timeout`](Self::handle_timeout).
    async fn fill_window(&self, st: &mut SenderState) -> Result<(), TransferError> {
        while let Some(seq) = st.window.take_next() {
            let was_empty = seq == st.window.base();
            st.transmissions += 1;
            let datagram = Segment {
                seq,
                payload: self.payloads[seq as usize].clone(),
            }
            .encode();
            if self.channel.send_to(&datagram, self.peer).await? {
                log::debug!(
                    "[sender] → DATA seq={seq} in_flight={}",
                    st.window.next_seq() - st.window.base()
                );
            } else {
                log::debug!("[sender] ✗ DATA seq={seq} dropped by channel");
            }
            // First segment of a previously empty window starts the timer.
            if was_empty {
                self.arm_timer(st);
            }
        }
        // After an ACK slid the window the timer was cancelled; anything
        // still unacknowledged needs a fresh timer for the new base.
        if st.window.has_unacked() && !st.timer.is_armed() {
            self.arm_timer(st);
        }
        Ok(())
    }

    /// The single authoritative timeout action: retransmit the entire
    /// outstanding window `[base, next_seq)` in order and re-arm the timer
    /// (Go-Back-N — never just the oldest segment).
    ///
    /// Reached from both the timer fire and the elapsed ACK wait, always
    /// under the shared lock.
    async fn handle_timeout(&self, st: &mut SenderState) {
        // The timer task and the elapsed ACK wait observe the same expiry;
        // collapse the second trigger instead of doubling the retransmit.
        if let Some(last) = st.last_timeout {
            if last.elapsed() < self.rto / 2 {
                return;
            }
        }
        st.timer.cancel();
        if !st.window.has_unacked() {
            return;
        }
        st.last_timeout = Some(Instant::now());

        st.retries += 1;
        if st.retries > self.max_retries {
            log::warn!(
                "[sender] no ACK progress after {} consecutive timeouts; giving up",
                st.retries - 1
            );
            st.failed = Some(TransferError::MaxRetriesExceeded);
            return;
        }

        let batch: Vec<u64> = st.window.outstanding().collect();
        log::debug!(
            "[sender] timeout — retransmitting {} segment(s) from base={}",
            batch.len(),
            st.window.base()
        );
        for seq in batch {
            st.retransmissions += 1;
            let datagram = Segment {
                seq,
                payload: self.payloads[seq as usize].clone(),
            }
            .encode();
            match self.channel.send_to(&datagram, self.peer).await {
                Ok(true) => log::debug!("[sender] ↻ DATA seq={seq}"),
                Ok(false) => log::debug!("[sender] ✗ DATA seq={seq} dropped by channel"),
                Err(e) => {
                    st.failed = Some(TransferError::Socket(e));
                    return;
                }
            }
        }
        self.arm_timer(st);
    }

    /// Arm the retransmission timer for the current window base.
    ///
    /// The fire future re-acquires the shared lock and re-checks the timer
    /// epoch before acting, so a cancellation that happens first — always
    /// under the same lock — wins the race.
    fn arm_timer(&self, st: &mut SenderState) {
        let this = self.clone();
        st.timer.arm(self.rto, move |epoch| async move {
            let mut st = this.shared.lock().await;
            if st.timer.epoch() != epoch {
                return; // cancelled between our sleep and the lock
            }
            st.timer.fired();
            this.handle_timeout(&mut st).await;
        });
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// Receiving endpoint: reassembles the segment stream and acknowledges
/// cumulatively.
pub struct Receiver {
    channel: Channel,
    reassembler: Reassembler,
    delivery: mpsc::Sender<(u64, Vec<u8>)>,
}

impl Receiver {
    /// Create a receiver that pushes each in-order `(seq, payload)` into
    /// `delivery` as it becomes contiguous.
    pub fn new(channel: Channel, delivery: mpsc::Sender<(u64, Vec<u8>)>) -> Self {
        Self {
            channel,
            reassembler: Reassembler::new(),
            delivery,
        }
    }

    /// Run the receive loop.
    ///
    /// The receiver never learns the transfer length and has no terminal
    /// state: it listens until its task is stopped, the delivery channel
    /// closes, or the socket fails. Malformed datagrams are dropped without
    /// an ACK; everything that parses — in-order, early, or duplicate — is
    /// answered with exactly one cumulative ACK.
    pub async fn run(mut self) -> Result<(), TransferError> {
        log::info!("[receiver] listening on {}", self.channel.local_addr());
        let mut delivered = Vec::new();

        loop {
            let Some((buf, from)) = self.channel.recv_from().await? else {
                log::debug!("[receiver] ✗ datagram discarded as corrupted");
                continue;
            };
            let segment = match Segment::decode(&buf) {
                Ok(segment) => segment,
                Err(e) => {
                    // No ACK for input that does not parse.
                    log::debug!("[receiver] malformed datagram ignored: {e}");
                    continue;
                }
            };

            delivered.clear();
            let arrival =
                self.reassembler
                    .on_segment(segment.seq, segment.payload, &mut delivered);
            match arrival {
                Arrival::InOrder => log::debug!(
                    "[receiver] ← DATA seq={} delivered {} segment(s)",
                    segment.seq,
                    delivered.len()
                ),
                Arrival::Buffered => log::debug!(
                    "[receiver] ← DATA seq={} out of order, buffered ({} held)",
                    segment.seq,
                    self.reassembler.buffered()
                ),
                Arrival::Duplicate => {
                    log::debug!("[receiver] ← DATA seq={} duplicate, discarded", segment.seq)
                }
            }

            for item in delivered.drain(..) {
                if self.delivery.send(item).await.is_err() {
                    log::warn!("[receiver] delivery channel closed; stopping");
                    return Ok(());
                }
            }

            let ack = self.reassembler.cumulative_ack();
            self.channel.send_to(&wire::encode_ack(ack), from).await?;
            log::debug!("[receiver] → ACK {}", fmt_ack(ack));
        }
    }
}

/// Render a cumulative ACK the way it travels on the wire (`-1` = none).
fn fmt_ack(ack: Option<u64>) -> i64 {
    ack.map_or(-1, |a| a as i64)
}
