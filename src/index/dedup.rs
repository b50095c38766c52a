use super::{timeline_order, Timed};

pub const DEFAULT_DEDUP_GAP: f64 = 60.0;

/// Collapses occurrences that sit too close together on the timeline
#[derive(Debug, Clone, Copy)]
pub struct TemporalDeduplicator {
    /// Minimum gap in tenths of a second
    gap_tenths: i64,
}

impl Default for TemporalDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_GAP)
    }
}

impl TemporalDeduplicator {
    pub fn new(time_threshold: f64) -> Self {
        Self {
            gap_tenths: to_tenths(time_threshold),
        }
    }

    /// Keep the earliest occurrence, then each one at least `time_threshold`
    /// after the last kept one. Scores are ignored, so a dropped occurrence
    /// may outscore the one kept before it.
    pub fn deduplicate<T: Timed>(&self, mut occurrences: Vec<T>) -> Vec<T> {
        occurrences.sort_by(timeline_order);

        let mut kept: Vec<T> = Vec::with_capacity(occurrences.len());
        for occ in occurrences {
            match kept.last() {
                Some(last) if to_tenths(occ.timestamp() - last.timestamp()) < self.gap_tenths => {}
                _ => kept.push(occ),
            }
        }
        kept
    }
}

/// Timestamps carry one decimal, so gaps are compared as whole tenths.
/// `64.1 - 4.1` is `59.99999...` in f64 but exactly 600 tenths.
fn to_tenths(seconds: f64) -> i64 {
    (seconds * 10.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{RawOccurrence, ScoredOccurrence};

    fn times<T: Timed>(occs: &[T]) -> Vec<f64> {
        occs.iter().map(|o| o.timestamp()).collect()
    }

    #[test]
    fn test_keeps_gap_separated_occurrences() {
        let occs: Vec<_> = [131.0, 10.0, 20.0, 130.0, 15.0]
            .iter()
            .map(|t| RawOccurrence::new("v", *t, ""))
            .collect();
        let kept = TemporalDeduplicator::default().deduplicate(occs);
        assert_eq!(times(&kept), vec![10.0, 130.0]);
    }

    #[test]
    fn test_gap_equal_to_threshold_is_kept() {
        let occs: Vec<_> = [0.0, 60.0, 119.9]
            .iter()
            .map(|t| RawOccurrence::new("v", *t, ""))
            .collect();
        let kept = TemporalDeduplicator::default().deduplicate(occs);
        assert_eq!(times(&kept), vec![0.0, 60.0]);
    }

    #[test]
    fn test_exact_gap_survives_float_subtraction() {
        let dedup = TemporalDeduplicator::default();
        for (first, second) in [(4.1, 64.1), (0.7, 60.7), (1234.3, 1294.3), (19999.9, 20059.9)] {
            let occs = vec![RawOccurrence::new("v", first, ""), RawOccurrence::new("v", second, "")];
            assert_eq!(times(&dedup.deduplicate(occs)), vec![first, second]);
        }

        let occs = vec![RawOccurrence::new("v", 4.1, ""), RawOccurrence::new("v", 64.0, "")];
        assert_eq!(times(&dedup.deduplicate(occs)), vec![4.1]);
    }

    #[test]
    fn test_every_one_decimal_start_keeps_exact_gap() {
        let dedup = TemporalDeduplicator::default();
        for tenth in 0..20_000 {
            let first = crate::index::round_timestamp(tenth as f64 / 10.0);
            let second = crate::index::round_timestamp(first + 60.0);
            let occs = vec![RawOccurrence::new("v", first, ""), RawOccurrence::new("v", second, "")];
            assert_eq!(dedup.deduplicate(occs).len(), 2, "gap {} -> {} dropped", first, second);
        }
    }

    #[test]
    fn test_higher_score_can_be_dropped() {
        let occs = vec![
            RawOccurrence::new("v", 0.0, "plain").with_score(1),
            RawOccurrence::new("v", 5.0, "这个单词").with_score(8),
        ];
        let kept: Vec<ScoredOccurrence> = TemporalDeduplicator::default().deduplicate(occs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 1);
    }

    #[test]
    fn test_equal_timestamps_tie_break_is_stable() {
        let a = vec![RawOccurrence::new("vb", 5.0, "x"), RawOccurrence::new("va", 5.0, "y")];
        let b = vec![RawOccurrence::new("va", 5.0, "y"), RawOccurrence::new("vb", 5.0, "x")];
        let dedup = TemporalDeduplicator::default();
        assert_eq!(dedup.deduplicate(a), dedup.deduplicate(b));
    }

    #[test]
    fn test_no_two_kept_closer_than_threshold() {
        let dedup = TemporalDeduplicator::new(7.5);
        let occs: Vec<_> = (0..200)
            .map(|i| RawOccurrence::new("v", ((i * 37) % 211) as f64 * 1.3, ""))
            .collect();
        let earliest = occs.iter().map(|o| o.timestamp).fold(f64::INFINITY, f64::min);
        let kept = dedup.deduplicate(occs);

        assert_eq!(kept[0].timestamp, earliest);
        for pair in kept.windows(2) {
            assert!(pair[1].timestamp - pair[0].timestamp >= 7.5);
        }
    }

    #[test]
    fn test_empty_input() {
        let kept: Vec<RawOccurrence> = TemporalDeduplicator::default().deduplicate(Vec::new());
        assert!(kept.is_empty());
    }
}
