//! Paced probe emitter.
//!
//! Probes for one identity are generated at a fixed rate and pass through a
//! bounded outbound queue before a writer puts them on the wire:
//!
//! ```text
//!   generator ──try_send──▶ [ outbound queue ] ──▶ writer ──▶ socket
//!       │ full?
//!       └── discard, remember for the next probe's upstream_drops field
//! ```
//!
//! A probe that finds the outbound queue full is discarded and never gets a
//! second chance.  The next probe that does get queued carries the number of
//! probes discarded since the previous queued one, so the far end can tell
//! sender-side loss from network loss.

use std::net::SocketAddr;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::SenderConfig;
use crate::error::Result;
use crate::probe::Probe;
use crate::socket::ProbeSocket;

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Serial numbering and upstream-drop bookkeeping for one identity.
#[derive(Debug, Clone)]
pub struct Emitter {
    id: i64,
    next_serial: i64,
    pending_drops: i64,
    /// Probes discarded over the emitter's lifetime.
    pub total_drops: u64,
}

impl Emitter {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            next_serial: 0,
            pending_drops: 0,
            total_drops: 0,
        }
    }

    /// Next probe in sequence, carrying the drops not yet reported.
    pub fn next_probe(&mut self) -> Probe {
        let probe = Probe::new(self.id, self.next_serial, self.pending_drops);
        self.next_serial += 1;
        probe
    }

    /// The last probe from [`next_probe`](Self::next_probe) was queued; its
    /// upstream drop count has been reported.
    pub fn accepted(&mut self) {
        self.pending_drops = 0;
    }

    /// The last probe was discarded; the next queued probe reports it.
    pub fn discarded(&mut self) {
        self.pending_drops += 1;
        self.total_drops += 1;
    }

    /// Serials handed out so far.
    pub fn generated(&self) -> u64 {
        u64::try_from(self.next_serial).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Sender task
// ---------------------------------------------------------------------------

/// Totals of one sender run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub generated: u64,
    pub sent: u64,
    /// Discarded by the outbound queue.
    pub queue_drops: u64,
}

/// Generate and send probes to `dest` until `config.count` is reached (or
/// forever when it is `None`).
///
/// The creation timestamp is refreshed just before each probe hits the
/// socket, so time spent in the outbound queue is not counted as RTT.
pub async fn run(
    config: SenderConfig,
    socket: &ProbeSocket,
    dest: SocketAddr,
) -> Result<SenderStats> {
    let (tx, mut rx) = mpsc::channel::<Probe>(config.queue_capacity.max(1));
    let mut emitter = Emitter::new(config.id);

    log::info!(
        "[tx] id={} → {dest} at {} pps (queue {})",
        config.id,
        config.rate,
        config.queue_capacity
    );

    let generator = async move {
        let mut pacing = interval(config.pacing());
        pacing.set_missed_tick_behavior(MissedTickBehavior::Burst);

        while config.count.map_or(true, |n| emitter.generated() < n) {
            pacing.tick().await;
            match tx.try_send(emitter.next_probe()) {
                Ok(()) => emitter.accepted(),
                Err(mpsc::error::TrySendError::Full(p)) => {
                    emitter.discarded();
                    log::debug!("[tx] outbound queue full; discarded serial={}", p.serial);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }
        // Dropping `tx` here lets the writer drain and finish.
        emitter
    };

    let writer = async {
        let mut sent = 0u64;
        while let Some(mut probe) = rx.recv().await {
            probe.created = Utc::now();
            socket.send_to(&probe, dest).await?;
            sent += 1;
        }
        Ok::<_, crate::error::Error>(sent)
    };

    let (emitter, sent) = tokio::join!(generator, writer);
    let stats = SenderStats {
        generated: emitter.generated(),
        sent: sent?,
        queue_drops: emitter.total_drops,
    };
    log::info!("[tx] done: {stats:?}");
    Ok(stats)
}
