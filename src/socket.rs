//! Async UDP socket abstraction.
//!
//! [`ProbeSocket`] is a thin wrapper around `tokio::net::UdpSocket` that speaks
//! [`Probe`] instead of raw bytes.  All measurement logic lives elsewhere;
//! this module owns only datagram I/O and receipt stamping.

use std::net::SocketAddr;

use chrono::Utc;
use tokio::net::UdpSocket;

use crate::error::Result;
use crate::probe::Probe;

/// Receive buffer size; anything longer than a probe is rejected by decode.
const RECV_BUF: usize = 2048;

/// An async, probe-oriented UDP socket.
///
/// All methods are `&self` so the socket can be shared across tasks.
#[derive(Debug)]
pub struct ProbeSocket {
    /// Address this socket is bound to (after the OS picks an ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl ProbeSocket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Encode `probe` and send it as one datagram to `dest`.
    pub async fn send_to(&self, probe: &Probe, dest: SocketAddr) -> Result<()> {
        self.inner.send_to(&probe.encode(), dest).await?;
        Ok(())
    }

    /// Send an already-encoded datagram to `dest`.
    pub async fn send_raw(&self, datagram: &[u8], dest: SocketAddr) -> Result<()> {
        self.inner.send_to(datagram, dest).await?;
        Ok(())
    }

    /// Receive the next datagram and decode it, stamping the receipt time.
    ///
    /// Returns `(probe, sender_address)`.  Datagrams that fail to decode are
    /// returned as `Err`; the caller decides whether to keep reading.
    pub async fn recv_from(&self) -> Result<(Probe, SocketAddr)> {
        let (datagram, addr) = self.recv_raw().await?;
        let probe = Probe::decode(&datagram, Utc::now())?;
        Ok((probe, addr))
    }

    /// Receive the next datagram without decoding it.
    pub async fn recv_raw(&self) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; RECV_BUF];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        buf.truncate(n);
        Ok((buf, addr))
    }
}
