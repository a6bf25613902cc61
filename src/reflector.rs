//! Server side: bounce every probe back where it came from.
//!
//! The reflector never interprets probes beyond validating them; a valid
//! datagram goes back byte for byte, so the creation timestamp the client
//! stamped survives the round trip.

use crate::error::Result;
use crate::probe::Probe;
use crate::socket::ProbeSocket;

/// Echo probes until the socket fails.
///
/// Undecodable datagrams and failed sends are logged and skipped; only a
/// receive error ends the loop.
pub async fn serve(socket: &ProbeSocket) -> Result<()> {
    log::info!("[reflect] listening on {}", socket.local_addr);

    loop {
        let (datagram, addr) = socket.recv_raw().await?;

        if let Err(e) = Probe::decode(&datagram, chrono::Utc::now()) {
            log::warn!("[reflect] {addr}: {e}");
            continue;
        }

        if let Err(e) = socket.send_raw(&datagram, addr).await {
            log::warn!("[reflect] → {addr} failed: {e}");
            continue;
        }
        log::trace!("[reflect] ← → {addr} {} bytes", datagram.len());
    }
}
