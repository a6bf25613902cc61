//! Run configuration.
//!
//! Plain structs with sensible defaults; `main.rs` fills them from the
//! command line.

use std::str::FromStr;
use std::time::Duration;

/// Default length of one measurement interval.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
/// Default capacity of the inbound probe queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
/// Default probe rate, in probes per second.
pub const DEFAULT_RATE: u32 = 100;
/// Default capacity of the sender's outbound queue.
pub const DEFAULT_SEND_QUEUE: usize = 100;

// ---------------------------------------------------------------------------
// OutputMode
// ---------------------------------------------------------------------------

/// How interval reports are rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// One human-readable line per interval.
    #[default]
    Text,
    /// One JSON record per interval, tagged with an operator label.
    Structured { tag: String },
}

impl FromStr for OutputMode {
    type Err = std::convert::Infallible;

    /// `"text"` selects text output; any other string is used as the tag of
    /// structured records.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "text" => OutputMode::Text,
            tag => OutputMode::Structured {
                tag: tag.to_string(),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Parameters of the measurement engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interval between window rotations.
    pub tick: Duration,
    /// Report rendering.
    pub output: OutputMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            output: OutputMode::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// SenderConfig
// ---------------------------------------------------------------------------

/// Parameters of the probe emitter.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Sender identity stamped on every probe.
    pub id: i64,
    /// Probes generated per second.
    pub rate: u32,
    /// Capacity of the outbound queue between generator and socket writer.
    pub queue_capacity: usize,
    /// Stop after this many probes (`None` = run until cancelled).
    pub count: Option<u64>,
}

impl SenderConfig {
    /// Gap between two generated probes.
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(1) / self.rate.max(1)
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            id: 1,
            rate: DEFAULT_RATE,
            queue_capacity: DEFAULT_SEND_QUEUE,
            count: None,
        }
    }
}
