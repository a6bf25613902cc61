//! Network receiver: socket → bounded probe queue.
//!
//! Reads echoed probes, stamps their receipt time (done by
//! [`ProbeSocket::recv_from`]) and hands them to the engine without ever
//! blocking on the queue.  When the queue is full the probe is dropped here
//! and counted locally; the engine never learns about these drops.

use std::net::SocketAddr;

use crate::error::{Error, Result};
use crate::queue::ProbeTx;
use crate::socket::ProbeSocket;

/// What the receiver saw over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Probes handed to the queue.
    pub queued: u64,
    /// Probes dropped because the queue was full.
    pub overflow: u64,
    /// Datagrams that failed to decode or came from an unexpected address.
    pub rejected: u64,
}

/// Feed probes from `socket` into `queue` until the queue closes.
///
/// When `peer` is set, datagrams from any other address are ignored.
pub async fn run(
    socket: &ProbeSocket,
    peer: Option<SocketAddr>,
    queue: ProbeTx,
) -> Result<ReceiverStats> {
    let mut stats = ReceiverStats::default();

    loop {
        let (probe, addr) = match socket.recv_from().await {
            Ok(v) => v,
            Err(Error::Decode(e)) => {
                stats.rejected += 1;
                log::warn!("[rx] bad datagram: {e}");
                continue;
            }
            Err(e) => return Err(e),
        };

        if peer.is_some_and(|p| p != addr) {
            stats.rejected += 1;
            log::debug!("[rx] ignoring datagram from {addr}");
            continue;
        }

        match queue.try_push(probe) {
            Ok(true) => stats.queued += 1,
            Ok(false) => {
                stats.overflow += 1;
                log::warn!("[rx] probe queue full; dropped (total {})", stats.overflow);
            }
            Err(Error::QueueClosed) => {
                log::debug!("[rx] probe queue closed; stopping");
                return Ok(stats);
            }
            Err(e) => return Err(e),
        }
    }
}
