//! Receive-side reassembly state machine.
//!
//! [`Reassembler`] consumes segments in whatever order the channel delivers
//! them and produces the original sequence, gap-free and exactly once:
//!
//! - An **in-order** segment (`seq == expected`) is delivered immediately,
//!   followed by every buffered segment it makes contiguous.
//! - An **early** segment (`seq > expected`) is buffered until the gap
//!   before it fills. This buffering is a deliberate departure from pure
//!   Go-Back-N (which would discard it); the sender-side protocol is
//!   unaffected because the ACK stays cumulative.
//! - A **duplicate** (`seq < expected`) is discarded.
//!
//! After every segment that reaches this machine — early and duplicate
//! included — the caller sends exactly one cumulative ACK of
//! [`cumulative_ack`]: the highest sequence number delivered in order so
//! far, or "none" before the first delivery. The receiver never reports
//! which out-of-order segments it holds.
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility (same pattern as [`crate::sender`]).
//!
//! [`cumulative_ack`]: Reassembler::cumulative_ack

use std::collections::BTreeMap;

/// Reassembly state for one transfer.
///
/// The reassembler does not know the transfer length and never terminates on
/// its own; it accepts segments until its owner stops calling it.
#[derive(Debug, Default)]
pub struct Reassembler {
    /// Next in-order sequence number the application is waiting for.
    expected: u64,
    /// Segments received ahead of `expected`, keyed by sequence number.
    ///
    /// Invariant: every key is strictly greater than `expected`.
    buffer: BTreeMap<u64, Vec<u8>>,
}

/// How [`Reassembler::on_segment`] classified an arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// In order; the segment (and possibly buffered successors) delivered.
    InOrder,
    /// Ahead of the in-order cursor; buffered, nothing delivered.
    Buffered,
    /// At or behind an already-delivered sequence number; discarded.
    Duplicate,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next expected in-order sequence number.
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Number of out-of-order segments currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Cumulative ACK value: highest sequence number delivered in order, or
    /// `None` before the first delivery.
    pub fn cumulative_ack(&self) -> Option<u64> {
        self.expected.checked_sub(1)
    }

    /// Process one segment arrival.
    ///
    /// Payloads delivered to the application by this arrival — in strictly
    /// increasing, gap-free sequence order — are appended to `delivered`.
    /// The classification is returned; in every case the caller owes the
    /// peer one cumulative ACK.
    pub fn on_segment(
        &mut self,
        seq: u64,
        payload: Vec<u8>,
        delivered: &mut Vec<(u64, Vec<u8>)>,
    ) -> Arrival {
        if seq == self.expected {
            delivered.push((seq, payload));
            self.expected += 1;
            // Drain the contiguous run this arrival unblocked.
            while let Some(payload) = self.buffer.remove(&self.expected) {
                delivered.push((self.expected, payload));
                self.expected += 1;
            }
            Arrival::InOrder
        } else if seq > self.expected {
            // A duplicate of an already-buffered segment lands here too;
            // overwriting is harmless.
            self.buffer.insert(seq, payload);
            Arrival::Buffered
        } else {
            Arrival::Duplicate
        }
    }
}
