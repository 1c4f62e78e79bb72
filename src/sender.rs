//! Go-Back-N send-side state machine.
//!
//! [`SenderWindow`] tracks the sliding window over a finite, known-length
//! sequence of segments:
//!
//! ```text
//!       base            next_seq
//!        │                  │
//!  ──────┼──────────────────┼──────────────────▶ seq space [0, total)
//!        │ ◀── in flight ──▶│ ◀── sendable ──▶
//! ```
//!
//! # Protocol contract
//!
//! - Invariant: `base ≤ next_seq ≤ base + window_size` and
//!   `next_seq ≤ total`.
//! - ACKs are **cumulative**: `ack = K` acknowledges every segment with
//!   sequence number ≤ K. Stale ACKs (`ack < base`, including "none yet")
//!   cause no state change.
//! - On timeout the caller retransmits **all** of [`outstanding`], not just
//!   the oldest segment (go back to N).
//! - [`take_next`] advances `next_seq` unconditionally once a segment is
//!   eligible — even when the channel then simulates a drop. The sender
//!   cannot observe drops; treating a dropped segment as "not yet sent"
//!   would be a different protocol.
//!
//! This module only manages state; all socket I/O and timer handling lives
//! in [`crate::transfer`].
//!
//! [`outstanding`]: SenderWindow::outstanding
//! [`take_next`]: SenderWindow::take_next

use std::ops::Range;

/// What a cumulative ACK did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// `ack < base` (or "none yet"), or beyond anything sent — ignored.
    Stale,
    /// The window advanced; unacknowledged or unsent segments remain.
    Advanced,
    /// The window advanced to `base == total`; the transfer is complete.
    Complete,
}

/// Go-Back-N send-side state for one transfer.
#[derive(Debug)]
pub struct SenderWindow {
    /// Sequence number of the oldest unacknowledged segment (left edge).
    base: u64,
    /// Sequence number of the next segment eligible for first transmission.
    next_seq: u64,
    /// Maximum number of segments in flight simultaneously (N ≥ 1).
    window_size: u64,
    /// Total number of segments in the transfer.
    total: u64,
}

impl SenderWindow {
    /// Create a window for a transfer of `total` segments.
    pub fn new(window_size: u64, total: u64) -> Self {
        assert!(window_size >= 1, "window_size must be at least 1");
        Self {
            base: 0,
            next_seq: 0,
            window_size,
            total,
        }
    }

    /// Left window edge: oldest unacknowledged sequence number.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Next sequence number eligible for first transmission.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// `true` when every segment has been acknowledged (`base == total`).
    pub fn is_complete(&self) -> bool {
        self.base == self.total
    }

    /// `true` when at least one segment is awaiting acknowledgement.
    pub fn has_unacked(&self) -> bool {
        self.base < self.next_seq
    }

    /// Sequence numbers currently in flight, oldest first: `[base, next_seq)`.
    ///
    /// This is exactly the batch a timeout retransmits.
    pub fn outstanding(&self) -> Range<u64> {
        self.base..self.next_seq
    }

    /// Claim the next sequence number for first transmission, if the window
    /// has room and unsent segments remain.
    ///
    /// Advances `next_seq`; the claim stands whether or not the channel then
    /// delivers the segment. Returns `None` when the window is full or all
    /// `total` segments have been handed to the channel.
    pub fn take_next(&mut self) -> Option<u64> {
        if self.next_seq < self.base + self.window_size && self.next_seq < self.total {
            let seq = self.next_seq;
            self.next_seq += 1;
            Some(seq)
        } else {
            None
        }
    }

    /// Process a cumulative ACK.
    ///
    /// `Some(k)` with `k ≥ base` slides the window to `base = k + 1`. ACKs
    /// behind `base`, the "none yet" ACK, and ACKs at or beyond `next_seq`
    /// (impossible from an honest receiver) are all [`AckOutcome::Stale`].
    pub fn on_ack(&mut self, ack: Option<u64>) -> AckOutcome {
        let ack = match ack {
            Some(a) if a >= self.base && a < self.next_seq => a,
            _ => return AckOutcome::Stale,
        };
        self.base = ack + 1;
        if self.is_complete() {
            AckOutcome::Complete
        } else {
            AckOutcome::Advanced
        }
    }
}
