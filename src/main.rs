//! Entry point for `rdt-over-udp`.
//!
//! Parses CLI arguments and dispatches into **send** or **recv** mode. All
//! protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, argument parsing, wiring sockets to channels).

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use rdt_over_udp::channel::{Channel, FaultProfile};
use rdt_over_udp::config::TransferConfig;
use rdt_over_udp::socket::Socket;
use rdt_over_udp::transfer::{Receiver, Sender};

/// Go-Back-N reliable data transfer over a simulated lossy UDP channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Transmit a batch of segments reliably to a receiver.
    Send {
        /// Receiver address to target.
        #[arg(short, long, default_value = "127.0.0.1:10000")]
        peer: SocketAddr,
        /// Local address to bind; port 0 picks an ephemeral port.
        #[arg(short, long, default_value = "127.0.0.1:0")]
        bind: SocketAddr,
        /// Number of segments in the transfer.
        #[arg(short = 'n', long, default_value_t = 20)]
        count: u64,
        /// Sliding-window size in segments.
        #[arg(short, long, default_value_t = 5)]
        window: u64,
        /// Retransmission timeout in milliseconds.
        #[arg(long, default_value_t = 2000)]
        rto_ms: u64,
        /// Probability that the channel drops an outbound segment.
        #[arg(long, default_value_t = 0.1)]
        loss: f64,
        /// Consecutive timeouts without progress before giving up.
        #[arg(long, default_value_t = 10)]
        max_retries: u32,
        /// Payload text carried by every segment.
        #[arg(short, long, default_value = "Hello Receiver!")]
        message: String,
    },
    /// Listen for segments and print the reassembled stream.
    Recv {
        /// Local address to bind.
        #[arg(short, long, default_value = "127.0.0.1:10000")]
        bind: SocketAddr,
        /// Probability that an inbound datagram is discarded as corrupted.
        #[arg(long, default_value_t = 0.1)]
        corrupt: f64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.mode {
        Mode::Send {
            peer,
            bind,
            count,
            window,
            rto_ms,
            loss,
            max_retries,
            message,
        } => {
            let cfg = TransferConfig {
                window_size: window,
                segment_count: count,
                rto: Duration::from_millis(rto_ms),
                max_retries,
                loss_probability: loss,
                ..Default::default()
            };
            run_send(bind, peer, message, cfg).await
        }
        Mode::Recv { bind, corrupt } => {
            let cfg = TransferConfig {
                corruption_probability: corrupt,
                ..Default::default()
            };
            run_recv(bind, cfg).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_send(
    bind: SocketAddr,
    peer: SocketAddr,
    message: String,
    cfg: TransferConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let socket = Socket::bind(bind).await?;
    let channel = Channel::new(socket, FaultProfile::sender(&cfg));

    let payloads = vec![message.into_bytes(); cfg.segment_count as usize];
    let sender = Sender::new(channel, peer, payloads, &cfg)?;
    sender.run().await?;
    Ok(())
}

async fn run_recv(bind: SocketAddr, cfg: TransferConfig) -> Result<(), Box<dyn std::error::Error>> {
    let socket = Socket::bind(bind).await?;
    let channel = Channel::new(socket, FaultProfile::receiver(&cfg));

    let (delivery_tx, mut delivery_rx) = mpsc::channel::<(u64, Vec<u8>)>(64);
    let printer = tokio::spawn(async move {
        while let Some((seq, payload)) = delivery_rx.recv().await {
            println!("{seq}: {}", String::from_utf8_lossy(&payload));
        }
    });

    // Runs until the process is stopped; the receiver never learns the
    // transfer length.
    let result = Receiver::new(channel, delivery_tx).run().await;
    printer.abort();
    result?;
    Ok(())
}
