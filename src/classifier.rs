//! Per-window loss / duplicate / reorder classification.
//!
//! [`process`] walks a closed window in arrival order and decides, for every
//! serial the [`SerialTracker`] expects, whether it was received, lost,
//! reordered or duplicated.  The open window is consulted as *lookahead*: a
//! serial that is missing so far but shows up after the boundary counts as
//! reordered, not lost.
//!
//! # Rules, per probe in arrival order
//!
//! | Probe serial vs. expected | Effect                                             |
//! |---------------------------|----------------------------------------------------|
//! | identity never seen       | received; expect `serial + 1`                      |
//! | below                     | received (already accounted for when skipped past) |
//! | above                     | for each missing serial: lost, or reordered (+dups) if found later; then as *equal* |
//! | equal                     | received; later copies are duplicates; expect next |
//!
//! Before the walk, [`fast_forward`] moves each known identity's cursor up to
//! the lowest serial present in the window: anything below that can no
//! longer turn up and is counted as dropped.
//!
//! Every probe in the closed window is counted as received exactly once.  A
//! missing serial found in the remainder of the closed window or in the
//! lookahead is counted as one reorder, and every further copy of it as a
//! duplicate.
//!
//! Lookups go through a [`MatchIndex`] built once per call, so a window with
//! many gaps costs near-linear time rather than a rescan per gap.

use std::collections::HashMap;

use crate::probe::Probe;
use crate::stats::IntervalStats;
use crate::tracker::SerialTracker;

// ---------------------------------------------------------------------------
// MatchIndex
// ---------------------------------------------------------------------------

/// `(identity, serial)` lookups over a closed window and its lookahead.
#[derive(Debug, Default)]
struct MatchIndex {
    /// Ascending positions in the closed window.
    closed: HashMap<(i64, i64), Vec<usize>>,
    /// Number of copies in the lookahead window.
    lookahead: HashMap<(i64, i64), u64>,
}

impl MatchIndex {
    fn build(closed: &[Probe], lookahead: &[Probe]) -> Self {
        let mut index = Self::default();
        for (pos, p) in closed.iter().enumerate() {
            index.closed.entry((p.id, p.serial)).or_default().push(pos);
        }
        for p in lookahead {
            *index.lookahead.entry((p.id, p.serial)).or_default() += 1;
        }
        index
    }

    /// Copies of `(id, serial)` at closed-window position `from` or later,
    /// plus all copies in the lookahead.
    fn count_from(&self, id: i64, serial: i64, from: usize) -> u64 {
        let key = (id, serial);
        let in_closed = self.closed.get(&key).map_or(0, |positions| {
            positions.len() - positions.partition_point(|&p| p < from)
        });
        in_closed as u64 + self.lookahead.get(&key).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify one closed window, mutating `tracker` in place.
pub fn process(
    closed: &[Probe],
    lookahead: &[Probe],
    tracker: &mut SerialTracker,
) -> IntervalStats {
    let mut local = IntervalStats {
        dropped: fast_forward(tracker, closed),
        ..Default::default()
    };
    let index = MatchIndex::build(closed, lookahead);

    for (position, probe) in closed.iter().enumerate() {
        local.upstream_drops += probe.upstream_drops;
        local.record_rtt(probe.rtt());
        local.received += 1;

        let Some(mut expected) = tracker.expected(probe.id) else {
            tracker.start(probe.id, probe.serial);
            continue;
        };

        if probe.serial < expected {
            continue;
        }

        // Catch the cursor up to this probe, one missing serial at a time.
        while expected < probe.serial {
            match index.count_from(probe.id, expected, position) {
                0 => {
                    log::trace!("[classify] id={} serial={} lost", probe.id, expected);
                    local.dropped += 1;
                }
                n => {
                    log::trace!(
                        "[classify] id={} serial={} late ({} cop{})",
                        probe.id,
                        expected,
                        n,
                        if n == 1 { "y" } else { "ies" }
                    );
                    local.reordered += 1;
                    local.duplicate += n - 1;
                }
            }
            tracker.advance(probe.id);
            expected += 1;
        }

        local.duplicate += index.count_from(probe.id, expected, position + 1);
        tracker.advance(probe.id);
    }

    log::debug!(
        "[classify] window={} lookahead={} rcvd={} drop={} reord={} dup={}",
        closed.len(),
        lookahead.len(),
        local.received,
        local.dropped,
        local.reordered,
        local.duplicate
    );
    local
}

/// Advance every known identity's cursor to the lowest serial it has in
/// `closed`, returning the number of serials skipped (all counted as lost).
///
/// Identities seen for the first time in `closed` are left untouched.
pub fn fast_forward(tracker: &mut SerialTracker, closed: &[Probe]) -> u64 {
    let mut lowest: HashMap<i64, i64> = HashMap::new();
    for p in closed {
        lowest
            .entry(p.id)
            .and_modify(|s| *s = (*s).min(p.serial))
            .or_insert(p.serial);
    }

    lowest
        .into_iter()
        .map(|(id, serial)| tracker.fast_forward(id, serial))
        .map(|skipped| u64::try_from(skipped).unwrap_or(0))
        .sum()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn probes(id: i64, serials: &[i64]) -> Vec<Probe> {
        serials.iter().map(|&s| Probe::new(id, s, 0)).collect()
    }

    fn counts(s: &IntervalStats) -> (u64, u64, u64, u64) {
        (s.received, s.dropped, s.reordered, s.duplicate)
    }

    #[test]
    fn in_order_stream_is_clean() {
        let mut t = SerialTracker::new();
        let s = process(&probes(1, &[0, 1, 2, 3, 4]), &[], &mut t);
        assert_eq!(counts(&s), (5, 0, 0, 0));
        assert_eq!(t.expected(1), Some(5));
    }

    #[test]
    fn missing_serial_is_dropped_once() {
        let mut t = SerialTracker::new();
        let s = process(&probes(1, &[1, 2, 4, 5]), &[], &mut t);
        assert_eq!(counts(&s), (4, 1, 0, 0));
        assert_eq!(t.expected(1), Some(6));
    }

    #[test]
    fn swapped_pair_is_one_reorder() {
        let mut t = SerialTracker::new();
        let s = process(&probes(1, &[1, 3, 2, 4]), &[], &mut t);
        assert_eq!(counts(&s), (4, 0, 1, 0));
        assert_eq!(t.expected(1), Some(5));
    }

    #[test]
    fn mixed_reorder_and_duplicate() {
        let mut t = SerialTracker::new();
        let s = process(&probes(1, &[1, 2, 4, 3, 4]), &[], &mut t);
        assert_eq!(counts(&s), (5, 0, 1, 1));
        assert_eq!(t.expected(1), Some(5));
    }

    #[test]
    fn copies_of_first_serial_are_not_duplicates() {
        let mut t = SerialTracker::new();
        let s = process(&probes(1, &[5, 5, 6]), &[], &mut t);
        assert_eq!(counts(&s), (3, 0, 0, 0));
        assert_eq!(t.expected(1), Some(7));
    }

    #[test]
    fn in_order_duplicate_counted_once() {
        let mut t = SerialTracker::new();
        let s = process(&probes(1, &[1, 2, 2, 3]), &[], &mut t);
        assert_eq!(counts(&s), (4, 0, 0, 1));
    }

    #[test]
    fn late_duplicate_counted_once() {
        let mut t = SerialTracker::new();
        process(&probes(1, &[1, 2]), &[], &mut t);
        let s = process(&probes(1, &[4, 3, 3]), &[], &mut t);
        assert_eq!(counts(&s), (3, 0, 1, 1));
        assert_eq!(t.expected(1), Some(5));
    }

    #[test]
    fn lookahead_turns_loss_into_reorder() {
        let mut t = SerialTracker::new();
        let s = process(&probes(1, &[1, 2, 4]), &probes(1, &[3, 5]), &mut t);
        assert_eq!(counts(&s), (3, 0, 1, 0));
        assert_eq!(t.expected(1), Some(5));

        // The late probe is received (below expected) in the next interval.
        let s = process(&probes(1, &[3, 5]), &[], &mut t);
        assert_eq!(counts(&s), (2, 0, 0, 0));
        assert_eq!(t.expected(1), Some(6));
    }

    #[test]
    fn lookahead_copies_of_expected_serial_are_duplicates() {
        let mut t = SerialTracker::new();
        let s = process(&probes(1, &[1, 2]), &probes(1, &[2, 3]), &mut t);
        assert_eq!(counts(&s), (2, 0, 0, 1));
    }

    #[test]
    fn fast_forward_counts_gap_before_window() {
        let mut t = SerialTracker::new();
        t.start(1, 4); // expects 5
        let s = process(&probes(1, &[9, 10]), &[], &mut t);
        assert_eq!(counts(&s), (2, 4, 0, 0));
        assert_eq!(t.expected(1), Some(11));
    }

    #[test]
    fn fast_forward_alone() {
        let mut t = SerialTracker::new();
        t.start(1, 4); // expects 5
        t.start(2, 0); // expects 1
        let closed = [probes(1, &[12, 9, 10]), probes(2, &[1]), probes(3, &[50])].concat();
        assert_eq!(fast_forward(&mut t, &closed), 4);
        assert_eq!(t.expected(1), Some(9));
        assert_eq!(t.expected(2), Some(1));
        assert_eq!(t.expected(3), None);
    }

    #[test]
    fn gap_across_windows() {
        let mut t = SerialTracker::new();
        let s = process(&probes(1, &[1]), &[], &mut t);
        assert_eq!(counts(&s), (1, 0, 0, 0));
        let s = process(&probes(1, &[3]), &[], &mut t);
        assert_eq!(counts(&s), (1, 1, 0, 0));
        assert_eq!(t.expected(1), Some(4));
    }

    #[test]
    fn identities_classified_independently() {
        let mut t = SerialTracker::new();
        let closed = vec![
            Probe::new(1, 0, 0),
            Probe::new(2, 100, 0),
            Probe::new(1, 2, 0),
            Probe::new(2, 101, 0),
            Probe::new(1, 1, 0),
        ];
        let s = process(&closed, &[], &mut t);
        assert_eq!(counts(&s), (5, 0, 1, 0));
        assert_eq!(t.expected(1), Some(3));
        assert_eq!(t.expected(2), Some(102));
    }

    #[test]
    fn other_identity_with_same_serial_is_not_a_match() {
        let mut t = SerialTracker::new();
        let closed = vec![Probe::new(1, 0, 0), Probe::new(1, 2, 0), Probe::new(2, 1, 0)];
        let s = process(&closed, &[], &mut t);
        assert_eq!(s.dropped, 1);
        assert_eq!(s.reordered, 0);
    }

    #[test]
    fn upstream_drops_and_rtt_summed() {
        let mut t = SerialTracker::new();
        let mut closed = vec![Probe::new(1, 0, 2), Probe::new(1, 1, 3)];
        closed[0].received = closed[0].created + chrono::Duration::milliseconds(10);
        closed[1].received = closed[1].created + chrono::Duration::milliseconds(30);
        let s = process(&closed, &[], &mut t);
        assert_eq!(s.upstream_drops, 5);
        assert_eq!(s.min_rtt, Some(std::time::Duration::from_millis(10)));
        assert_eq!(s.max_rtt, Some(std::time::Duration::from_millis(30)));
        assert_eq!(s.average_rtt(), Some(std::time::Duration::from_millis(20)));
    }

    #[test]
    fn empty_window_yields_empty_stats() {
        let mut t = SerialTracker::new();
        let s = process(&[], &probes(1, &[1]), &mut t);
        assert_eq!(s, IntervalStats::default());
        assert!(t.is_empty());
    }

    #[test]
    fn index_counts_from_position() {
        let closed = probes(1, &[5, 5, 6, 5]);
        let lookahead = probes(1, &[5]);
        let index = MatchIndex::build(&closed, &lookahead);
        assert_eq!(index.count_from(1, 5, 0), 4);
        assert_eq!(index.count_from(1, 5, 1), 3);
        assert_eq!(index.count_from(1, 5, 2), 2);
        assert_eq!(index.count_from(1, 5, 4), 1);
        assert_eq!(index.count_from(2, 5, 0), 0);
    }
}
