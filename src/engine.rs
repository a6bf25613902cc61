//! The measurement engine: one task owning every piece of mutable state.
//!
//! # Event loop
//!
//! ```text
//!   ProbeRx ───────────────┐
//!                          │   tokio::select! (one event per turn)
//!   interval (tick) ───────┼──▶ ┌──────────────────────────────┐
//!                          │    │ Engine                        │
//!   snapshot requests ─────┘    │  WindowPair / SerialTracker   │
//!                               │  CumulativeStats / Reporter   │
//!                               └──────────────────────────────┘
//! ```
//!
//! - **Probe arrival**: appended to the open window, nothing else.
//! - **Tick**: classify the closed window with the open window as lookahead,
//!   merge the result into the cumulative totals, report it together with the
//!   queue occupancy, then rotate the windows.
//! - **Snapshot request**: reply with a copy of the cumulative totals.
//!
//! When several sources are ready at once `select!` picks one at random;
//! no ordering between arrivals and ticks is promised beyond "a probe is in
//! the window if it was appended before the tick was handled".
//!
//! The first tick fires one period after start.  Ticks missed because the
//! loop was busy are skipped, not bunched.
//!
//! # Shutdown
//!
//! Once the probe queue is closed and drained the engine flushes both
//! windows with two final ticks and returns the cumulative totals.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::classifier;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::probe::Probe;
use crate::queue::ProbeRx;
use crate::report::Reporter;
use crate::stats::{CumulativeStats, IntervalStats};
use crate::tracker::SerialTracker;
use crate::window::WindowPair;

/// Pending snapshot requests the engine will serve between events.
const SNAPSHOT_BACKLOG: usize = 8;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Copy of the engine's lifetime totals plus queue state at the moment the
/// request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub cumulative: CumulativeStats,
    pub queue_len: usize,
    pub queue_capacity: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Window, tracker and cumulative state for one measurement run.
#[derive(Debug)]
pub struct Engine {
    windows: WindowPair,
    tracker: SerialTracker,
    cumulative: CumulativeStats,
    reporter: Reporter,
    period: Duration,
}

impl Engine {
    /// Engine reporting to standard output.
    pub fn new(config: EngineConfig) -> Self {
        let reporter = Reporter::stdout(config.output);
        Self::with_reporter(config.tick, reporter)
    }

    /// Engine reporting through `reporter`.
    pub fn with_reporter(period: Duration, reporter: Reporter) -> Self {
        Self {
            windows: WindowPair::new(),
            tracker: SerialTracker::new(),
            cumulative: CumulativeStats::new(),
            reporter,
            period,
        }
    }

    /// A probe arrived: append it to the open window.
    pub fn on_probe(&mut self, probe: Probe) {
        self.windows.push(probe);
    }

    /// Interval boundary: classify, accumulate, report, rotate.
    ///
    /// `queue_len` / `queue_cap` describe the inbound queue and only feed the
    /// report.
    pub fn tick(&mut self, queue_len: usize, queue_cap: usize) -> IntervalStats {
        let (closed, lookahead) = self.windows.analysis();
        let local = classifier::process(closed, lookahead, &mut self.tracker);

        self.cumulative.accumulate(&local);
        self.reporter.report(&local, queue_len, queue_cap);
        self.windows.rotate();
        local
    }

    pub fn cumulative(&self) -> &CumulativeStats {
        &self.cumulative
    }

    pub fn tracker(&self) -> &SerialTracker {
        &self.tracker
    }

    pub fn windows(&self) -> &WindowPair {
        &self.windows
    }

    /// Run the engine on its own task.
    ///
    /// The task ends after `probes` closes; its result is the final
    /// cumulative totals.
    pub fn spawn(self, probes: ProbeRx) -> (EngineHandle, JoinHandle<CumulativeStats>) {
        let (requests_tx, requests_rx) = mpsc::channel(SNAPSHOT_BACKLOG);
        let task = tokio::spawn(self.run(probes, requests_rx));
        (EngineHandle { requests: requests_tx }, task)
    }

    /// Event loop.  See the module docs.
    pub async fn run(
        mut self,
        mut probes: ProbeRx,
        mut requests: mpsc::Receiver<oneshot::Sender<Snapshot>>,
    ) -> CumulativeStats {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut snapshots_open = true;

        log::debug!(
            "[engine] started period={:?} capacity={}",
            self.period,
            probes.capacity()
        );

        loop {
            tokio::select! {
                maybe_probe = probes.recv() => match maybe_probe {
                    Some(probe) => self.on_probe(probe),
                    None => break,
                },

                _ = ticker.tick() => {
                    self.tick(probes.len(), probes.capacity());
                }

                request = requests.recv(), if snapshots_open => match request {
                    Some(reply) => {
                        let _ = reply.send(Snapshot {
                            cumulative: self.cumulative,
                            queue_len: probes.len(),
                            queue_capacity: probes.capacity(),
                        });
                    }
                    None => snapshots_open = false,
                },
            }
        }

        log::debug!("[engine] probe queue closed; flushing windows");
        let capacity = probes.capacity();
        for _ in 0..2 {
            if self.windows.is_empty() {
                break;
            }
            self.tick(0, capacity);
        }
        self.cumulative
    }
}

// ---------------------------------------------------------------------------
// EngineHandle
// ---------------------------------------------------------------------------

/// Cloneable handle for reading the cumulative totals from another task.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    requests: mpsc::Sender<oneshot::Sender<Snapshot>>,
}

impl EngineHandle {
    /// Ask the engine for a copy of its cumulative totals.
    ///
    /// Fails with [`Error::EngineStopped`] once the engine task has ended.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(reply_tx)
            .await
            .map_err(|_| Error::EngineStopped)?;
        reply_rx.await.map_err(|_| Error::EngineStopped)
    }
}
