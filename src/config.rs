//! Tunable transfer parameters.
//!
//! Every knob the protocol exposes lives in [`TransferConfig`]; both the
//! library entry points and the CLI flags in `main.rs` are built from it.
//! Defaults match the reference deployment: a 5-segment window, 20 segments
//! per transfer, a 2-second retransmission timeout, and 10% simulated loss
//! and corruption.

use std::time::Duration;

/// Parameters for one reliable transfer.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Maximum number of unacknowledged segments in flight (window size N).
    pub window_size: u64,
    /// Total number of segments in the transfer (known to the sender only).
    pub segment_count: u64,
    /// Retransmission timeout. Also bounds the ACK listener's blocking wait.
    pub rto: Duration,
    /// Consecutive timeouts without window progress before the sender gives
    /// up with [`crate::transfer::TransferError::MaxRetriesExceeded`].
    pub max_retries: u32,
    /// Probability that the channel drops an outbound data segment.
    pub loss_probability: f64,
    /// Probability that the channel discards an inbound datagram before it
    /// is parsed (simulated corruption).
    pub corruption_probability: f64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            segment_count: 20,
            rto: Duration::from_secs(2),
            max_retries: 10,
            loss_probability: 0.1,
            corruption_probability: 0.1,
        }
    }
}

impl TransferConfig {
    /// Validate probability ranges and window sanity.
    ///
    /// Called by the transfer entry points; probabilities outside `[0, 1]`
    /// would otherwise panic inside the RNG.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be at least 1".into());
        }
        for (name, p) in [
            ("loss_probability", self.loss_probability),
            ("corruption_probability", self.corruption_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{name} must be within [0.0, 1.0], got {p}"));
            }
        }
        Ok(())
    }
}
