//! Per-interval reports.
//!
//! [`Reporter`] renders one [`IntervalStats`] either as a human-readable
//! line or as a tagged JSON record, one per line, into any [`Write`] sink
//! (standard output in the binary).  Intervals with nothing received produce
//! no output at all.
//!
//! Text line:
//!
//! ```text
//! received: 98 dropped: 2(2.00%) re-ordered: 1(1.02%) duplicates: 0 avg rtt: 1.2ms fastest: -200µs slowest: +3.1ms queue: 0/1000 qdrops: 0
//! ```
//!
//! JSON record field names are fixed for downstream collectors:
//! `Tag, TimestampUtc, ReceivedPackets, DroppedPackets, DuplicatePackets,
//! ReorderedPackets, AverageRTT, LowestRTT, HighestRTT, PBQueueDroppedPackets,
//! PBQueueLength, PBQueueCapacity`.  RTT values are milliseconds as `f64`.

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::OutputMode;
use crate::error::Result;
use crate::stats::IntervalStats;

/// Structured form of one interval report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JsonReport {
    pub tag: String,
    pub timestamp_utc: DateTime<Utc>,
    pub received_packets: u64,
    pub dropped_packets: u64,
    pub duplicate_packets: u64,
    pub reordered_packets: u64,
    #[serde(rename = "AverageRTT")]
    pub average_rtt: f64,
    #[serde(rename = "LowestRTT")]
    pub lowest_rtt: f64,
    #[serde(rename = "HighestRTT")]
    pub highest_rtt: f64,
    #[serde(rename = "PBQueueDroppedPackets")]
    pub pb_queue_dropped_packets: i64,
    #[serde(rename = "PBQueueLength")]
    pub pb_queue_length: usize,
    #[serde(rename = "PBQueueCapacity")]
    pub pb_queue_capacity: usize,
}

impl JsonReport {
    pub fn new(
        tag: &str,
        timestamp_utc: DateTime<Utc>,
        stats: &IntervalStats,
        queue_len: usize,
        queue_cap: usize,
    ) -> Self {
        Self {
            tag: tag.to_string(),
            timestamp_utc,
            received_packets: stats.received,
            dropped_packets: stats.dropped,
            duplicate_packets: stats.duplicate,
            reordered_packets: stats.reordered,
            average_rtt: millis(stats.average_rtt().unwrap_or_default()),
            lowest_rtt: millis(stats.min_rtt.unwrap_or_default()),
            highest_rtt: millis(stats.max_rtt.unwrap_or_default()),
            pb_queue_dropped_packets: stats.upstream_drops,
            pb_queue_length: queue_len,
            pb_queue_capacity: queue_cap,
        }
    }

    /// Encode as a single JSON object (no trailing newline).
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Render the human-readable line for one interval (no trailing newline).
///
/// `fastest` and `slowest` are the min / max RTT relative to the average.
pub fn text_line(stats: &IntervalStats, queue_len: usize, queue_cap: usize) -> String {
    let avg = stats.average_rtt().unwrap_or_default();
    let min = stats.min_rtt.unwrap_or(avg);
    let max = stats.max_rtt.unwrap_or(avg);

    format!(
        "received: {} dropped: {}({:.2}%) re-ordered: {}({:.2}%) duplicates: {} \
         avg rtt: {} fastest: {} slowest: +{} queue: {}/{} qdrops: {}",
        stats.received,
        stats.dropped,
        stats.drop_percent(),
        stats.reordered,
        stats.reorder_percent(),
        stats.duplicate,
        fmt_duration(avg),
        fmt_below(avg.saturating_sub(min)),
        fmt_duration(max.saturating_sub(avg)),
        queue_len,
        queue_cap,
        stats.upstream_drops,
    )
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

fn fmt_duration(d: Duration) -> String {
    if d.is_zero() {
        "0s".to_string()
    } else {
        format!("{d:?}")
    }
}

fn fmt_below(d: Duration) -> String {
    if d.is_zero() {
        "0s".to_string()
    } else {
        format!("-{d:?}")
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

/// Writes interval reports to a sink in the configured [`OutputMode`].
pub struct Reporter {
    mode: OutputMode,
    sink: Box<dyn Write + Send>,
}

impl Reporter {
    pub fn new(mode: OutputMode, sink: Box<dyn Write + Send>) -> Self {
        Self { mode, sink }
    }

    /// Reporter writing to standard output.
    pub fn stdout(mode: OutputMode) -> Self {
        Self::new(mode, Box::new(std::io::stdout()))
    }

    /// Emit the report for one interval.
    ///
    /// Returns `true` if a line was written.  Nothing is written when
    /// `stats.received == 0`.  Encoding or write failures are logged and the
    /// interval is skipped.
    pub fn report(&mut self, stats: &IntervalStats, queue_len: usize, queue_cap: usize) -> bool {
        if stats.received == 0 {
            return false;
        }

        let line = match &self.mode {
            OutputMode::Text => text_line(stats, queue_len, queue_cap).into_bytes(),
            OutputMode::Structured { tag } => {
                match JsonReport::new(tag, Utc::now(), stats, queue_len, queue_cap).encode() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::error!("[report] {e}");
                        return false;
                    }
                }
            }
        };

        let written = self
            .sink
            .write_all(&line)
            .and_then(|()| self.sink.write_all(b"\n"))
            .and_then(|()| self.sink.flush());
        match written {
            Ok(()) => true,
            Err(e) => {
                log::error!("[report] write failed: {e}");
                false
            }
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").field("mode", &self.mode).finish()
    }
}
