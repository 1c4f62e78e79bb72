//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that deals in
//! whole datagrams. It stays below the wire format on purpose: what a
//! malformed datagram means differs per side (a data segment that fails to
//! parse gets no ACK, a garbled ACK is merely ignored), so parsing lives
//! with the protocol loops in [`crate::transfer`], not here.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

/// Receive buffer size; datagrams in this protocol stay well under the MTU.
const MAX_DATAGRAM: usize = 2048;

/// An async, datagram-oriented UDP socket.
///
/// All methods are `&self` so the socket can be shared across tasks.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (resolved after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `127.0.0.1:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Send `buf` as a single datagram to `dest`.
    pub async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<()> {
        self.inner.send_to(buf, dest).await?;
        Ok(())
    }

    /// Receive the next datagram.
    ///
    /// Returns `(payload, sender_address)`.
    pub async fn recv_from(&self) -> io::Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        buf.truncate(n);
        Ok((buf, addr))
    }
}
