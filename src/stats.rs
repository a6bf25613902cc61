//! Interval and cumulative statistics.
//!
//! [`IntervalStats`] is produced fresh for every closed window by
//! [`crate::classifier::process`].  [`CumulativeStats`] lives for the whole
//! run and absorbs each interval through [`CumulativeStats::accumulate`]:
//! counts and the RTT total add up, the RTT minimum only tightens and the RTT
//! maximum only grows.

use std::time::Duration;

// ---------------------------------------------------------------------------
// IntervalStats
// ---------------------------------------------------------------------------

/// Classification result for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalStats {
    pub received: u64,
    pub dropped: u64,
    pub duplicate: u64,
    pub reordered: u64,
    /// Sum of the in-band upstream queue drop field of every probe analysed.
    pub upstream_drops: i64,
    /// Smallest RTT sample, `None` until the first sample.
    pub min_rtt: Option<Duration>,
    /// Largest RTT sample, `None` until the first sample.
    pub max_rtt: Option<Duration>,
    /// Sum of all RTT samples.
    pub total_rtt: Duration,
}

impl IntervalStats {
    /// Fold one RTT sample into min / max / total.
    pub fn record_rtt(&mut self, rtt: Duration) {
        self.total_rtt += rtt;
        self.min_rtt = Some(self.min_rtt.map_or(rtt, |m| m.min(rtt)));
        self.max_rtt = Some(self.max_rtt.map_or(rtt, |m| m.max(rtt)));
    }

    /// Mean RTT over received packets, `None` when nothing was received.
    pub fn average_rtt(&self) -> Option<Duration> {
        if self.received == 0 {
            return None;
        }
        let nanos = self.total_rtt.as_nanos() / u128::from(self.received);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// Dropped packets as a percentage of `received + dropped`.
    pub fn drop_percent(&self) -> f64 {
        percent(self.dropped, self.received + self.dropped)
    }

    /// Reordered packets as a percentage of `received + dropped`.
    pub fn reorder_percent(&self) -> f64 {
        percent(self.reordered, self.received + self.dropped)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// CumulativeStats
// ---------------------------------------------------------------------------

/// Lifetime totals, merged once per interval.
///
/// Owned by the engine; other contexts read it only through
/// [`crate::engine::EngineHandle::snapshot`], which hands out a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CumulativeStats {
    pub totals: IntervalStats,
    /// Number of intervals merged so far.
    pub intervals: u64,
}

impl CumulativeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one interval into the running totals.
    pub fn accumulate(&mut self, local: &IntervalStats) {
        let t = &mut self.totals;
        t.received += local.received;
        t.dropped += local.dropped;
        t.duplicate += local.duplicate;
        t.reordered += local.reordered;
        t.upstream_drops += local.upstream_drops;
        t.total_rtt += local.total_rtt;

        if let Some(min) = local.min_rtt {
            t.min_rtt = Some(t.min_rtt.map_or(min, |m| m.min(min)));
        }
        if let Some(max) = local.max_rtt {
            t.max_rtt = Some(t.max_rtt.map_or(max, |m| m.max(max)));
        }

        self.intervals += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn rtt_extremes_start_unset() {
        let s = IntervalStats::default();
        assert_eq!(s.min_rtt, None);
        assert_eq!(s.max_rtt, None);
        assert_eq!(s.average_rtt(), None);
    }

    #[test]
    fn record_rtt_tracks_min_max_total() {
        let mut s = IntervalStats::default();
        for r in [5, 2, 9] {
            s.record_rtt(ms(r));
        }
        s.received = 3;
        assert_eq!(s.min_rtt, Some(ms(2)));
        assert_eq!(s.max_rtt, Some(ms(9)));
        assert_eq!(s.total_rtt, ms(16));
        assert_eq!(s.average_rtt(), Some(Duration::from_nanos(16_000_000 / 3)));
    }

    #[test]
    fn zero_rtt_sample_is_a_real_minimum() {
        let mut s = IntervalStats::default();
        s.record_rtt(ms(3));
        s.record_rtt(Duration::ZERO);
        s.record_rtt(ms(1));
        assert_eq!(s.min_rtt, Some(Duration::ZERO));
    }

    #[test]
    fn percentages_use_received_plus_dropped() {
        let s = IntervalStats {
            received: 90,
            dropped: 10,
            reordered: 5,
            ..Default::default()
        };
        assert!((s.drop_percent() - 10.0).abs() < 1e-9);
        assert!((s.reorder_percent() - 5.0).abs() < 1e-9);
        assert_eq!(IntervalStats::default().drop_percent(), 0.0);
    }

    #[test]
    fn accumulate_sums_counts() {
        let mut g = CumulativeStats::new();
        let local = IntervalStats {
            received: 10,
            dropped: 2,
            duplicate: 1,
            reordered: 3,
            upstream_drops: 4,
            ..Default::default()
        };
        g.accumulate(&local);
        g.accumulate(&local);
        assert_eq!(g.totals.received, 20);
        assert_eq!(g.totals.dropped, 4);
        assert_eq!(g.totals.duplicate, 2);
        assert_eq!(g.totals.reordered, 6);
        assert_eq!(g.totals.upstream_drops, 8);
        assert_eq!(g.intervals, 2);
    }

    #[test]
    fn accumulate_min_only_tightens_max_only_grows() {
        let mut g = CumulativeStats::new();
        let mut a = IntervalStats::default();
        a.record_rtt(ms(4));
        a.record_rtt(ms(8));
        let mut b = IntervalStats::default();
        b.record_rtt(ms(6));

        g.accumulate(&a);
        g.accumulate(&b);
        assert_eq!(g.totals.min_rtt, Some(ms(4)));
        assert_eq!(g.totals.max_rtt, Some(ms(8)));
        assert_eq!(g.totals.total_rtt, ms(18));

        let mut c = IntervalStats::default();
        c.record_rtt(ms(1));
        c.record_rtt(ms(20));
        g.accumulate(&c);
        assert_eq!(g.totals.min_rtt, Some(ms(1)));
        assert_eq!(g.totals.max_rtt, Some(ms(20)));
    }

    #[test]
    fn empty_interval_leaves_extremes_alone() {
        let mut g = CumulativeStats::new();
        let mut a = IntervalStats::default();
        a.record_rtt(ms(4));
        g.accumulate(&a);
        g.accumulate(&IntervalStats::default());
        assert_eq!(g.totals.min_rtt, Some(ms(4)));
        assert_eq!(g.totals.max_rtt, Some(ms(4)));
        assert_eq!(g.intervals, 2);
    }
}
