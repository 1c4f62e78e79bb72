//! Unreliable-channel simulator.
//!
//! Real networks drop datagrams; to exercise the reliability mechanisms
//! without depending on actual network conditions, [`Channel`] wraps a
//! [`crate::socket::Socket`] and applies a configurable fault model:
//!
//! | Fault      | Path                 | Description                          |
//! |------------|----------------------|--------------------------------------|
//! | Loss       | outbound (`send_to`) | Drop with probability `drop_outbound`. |
//! | Corruption | inbound (`recv_from`)| Discard with probability `drop_inbound`, checked immediately after the datagram is physically received and before any parsing. |
//!
//! Each fault is an independent Bernoulli trial per datagram. A discarded
//! datagram produces no signal to either endpoint — that silence is the
//! entire model of an unreliable network. Reordering and duplication are not
//! simulated; the sliding window already tolerates both, and retransmission
//! produces natural duplicates.
//!
//! The RNG is seedable ([`Channel::with_seed`]) so test failures are
//! reproducible.

use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::socket::Socket;

/// Per-direction drop probabilities, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy)]
pub struct FaultProfile {
    /// Probability that an outbound datagram is silently dropped.
    pub drop_outbound: f64,
    /// Probability that an inbound datagram is discarded before parsing.
    pub drop_inbound: f64,
}

impl Default for FaultProfile {
    fn default() -> Self {
        // No faults by default — the channel is a transparent pass-through.
        Self {
            drop_outbound: 0.0,
            drop_inbound: 0.0,
        }
    }
}

impl FaultProfile {
    /// Sender-side profile: data segments are lost on the way out with
    /// `loss_probability`; returning ACKs are not tampered with.
    pub fn sender(cfg: &crate::config::TransferConfig) -> Self {
        Self {
            drop_outbound: cfg.loss_probability,
            drop_inbound: 0.0,
        }
    }

    /// Receiver-side profile: inbound datagrams are discarded as corrupted
    /// with `corruption_probability`; outbound ACKs go out untouched.
    pub fn receiver(cfg: &crate::config::TransferConfig) -> Self {
        Self {
            drop_outbound: 0.0,
            drop_inbound: cfg.corruption_probability,
        }
    }
}

/// A fault-injecting wrapper around the socket layer.
pub struct Channel {
    socket: Socket,
    faults: FaultProfile,
    // std Mutex: held only for the Bernoulli draw, never across an await.
    rng: Mutex<StdRng>,
}

impl Channel {
    /// Wrap `socket` with the given fault profile, seeding from entropy.
    pub fn new(socket: Socket, faults: FaultProfile) -> Self {
        Self {
            socket,
            faults,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Like [`Channel::new`] but with a fixed RNG seed for reproducible runs.
    pub fn with_seed(socket: Socket, faults: FaultProfile, seed: u64) -> Self {
        Self {
            socket,
            faults,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Address the underlying socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Send `buf` to `dest`, subject to the outbound loss trial.
    ///
    /// Returns `Ok(true)` if the datagram was handed to the socket and
    /// `Ok(false)` if the channel simulated a loss. Callers may log the
    /// simulated loss but must not treat it as "not sent": the whole point
    /// of the protocol is that the sender cannot observe drops.
    pub async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<bool> {
        if self.draw(self.faults.drop_outbound) {
            return Ok(false);
        }
        self.socket.send_to(buf, dest).await?;
        Ok(true)
    }

    /// Receive the next datagram, subject to the inbound corruption trial.
    ///
    /// Returns `Ok(None)` when the datagram was physically received but
    /// discarded as corrupted — callers simply wait for the next one.
    pub async fn recv_from(&self) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
        let (buf, addr) = self.socket.recv_from().await?;
        if self.draw(self.faults.drop_inbound) {
            return Ok(None);
        }
        Ok(Some((buf, addr)))
    }

    /// One Bernoulli trial with success probability `p`.
    fn draw(&self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_bool(p.min(1.0))
    }
}
