//! Seeded network fault model for deterministic testing.
//!
//! Real networks drop, reorder and duplicate packets.  To exercise the
//! classifier without depending on actual network conditions, [`Simulator`]
//! takes a probe sequence in send order and returns it in "arrival" order
//! after applying a configurable fault model:
//!
//! | Fault        | Description                                          |
//! |--------------|------------------------------------------------------|
//! | Loss         | Drop a probe with probability `loss_rate`.           |
//! | Duplication  | Deliver a surviving probe twice.                     |
//! | Reordering   | Swap a probe with its successor (pairs never overlap). |
//!
//! The RNG is seeded from the config, so a failing run can be replayed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::probe::Probe;

/// Fault probabilities, each in `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub loss_rate: f64,
    pub duplicate_rate: f64,
    pub reorder_rate: f64,
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults: the simulator is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            reorder_rate: 0.0,
            seed: 0,
        }
    }
}

/// Faults injected so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultCounts {
    pub lost: u64,
    pub duplicated: u64,
    pub swapped: u64,
}

/// A fault-injecting stand-in for the network path.
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
    pub faults: FaultCounts,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            faults: FaultCounts::default(),
        }
    }

    /// Pass `sent` through the fault model and return the arrivals.
    pub fn apply(&mut self, sent: Vec<Probe>) -> Vec<Probe> {
        let mut arrived = Vec::with_capacity(sent.len());

        for probe in sent {
            if self.roll(self.config.loss_rate) {
                self.faults.lost += 1;
                continue;
            }
            if self.roll(self.config.duplicate_rate) {
                self.faults.duplicated += 1;
                arrived.push(probe.clone());
            }
            arrived.push(probe);
        }

        let mut i = 0;
        while i + 1 < arrived.len() {
            if self.roll(self.config.reorder_rate) {
                arrived.swap(i, i + 1);
                self.faults.swapped += 1;
                i += 2;
            } else {
                i += 1;
            }
        }

        arrived
    }

    fn roll(&mut self, p: f64) -> bool {
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }
}
