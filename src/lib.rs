//! `rdt-over-udp` — Go-Back-N reliable data transfer over a simulated lossy
//! UDP channel.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  data segments   ┌──────────┐
//!  │  Sender  │─────────────────▶│ Receiver │
//!  └────┬─────┘                  └─────┬────┘
//!       │       cumulative ACKs        │
//!       │◀──────────────────────────────┘
//!       │
//!  ┌────▼──────────────────────────────┐
//!  │            Channel                │
//!  │  (Bernoulli loss / corruption)    │
//!  └────┬──────────────────────────────┘
//!       │ raw UDP datagrams
//!  ┌────▼──────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! The sender pushes a fixed, known-length sequence of segments through the
//! lossy channel; the receiver reassembles them in order and acknowledges
//! cumulatively; the sender's sliding window plus a single retransmission
//! timer recover whatever the channel eats.
//!
//! Each module has a single responsibility:
//! - [`wire`]     — datagram text format (serialise / deserialise)
//! - [`config`]   — tunable transfer parameters
//! - [`socket`]   — async UDP socket abstraction
//! - [`channel`]  — unreliable-channel simulator (loss / corruption)
//! - [`sender`]   — Go-Back-N send-window state machine
//! - [`receiver`] — out-of-order reassembly state machine
//! - [`timer`]    — cancellable retransmission timer
//! - [`transfer`] — I/O orchestration: run loops, ACK listener, errors

pub mod channel;
pub mod config;
pub mod receiver;
pub mod sender;
pub mod socket;
pub mod timer;
pub mod transfer;
pub mod wire;
