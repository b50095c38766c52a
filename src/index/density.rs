use std::collections::HashSet;

pub const DEFAULT_TIME_WINDOW: f64 = 120.0;
pub const DEFAULT_DENSE_THRESHOLD: usize = 3;

/// Burst statistics for one lemma
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DensityProfile {
    /// Largest number of timestamps found in any window
    pub max_density: usize,
    dense: HashSet<u64>,
}

impl DensityProfile {
    /// Whether the timestamp falls inside at least one dense window
    pub fn is_dense(&self, timestamp: f64) -> bool {
        self.dense.contains(&timestamp_key(timestamp))
    }

    /// Number of distinct dense timestamps
    pub fn dense_count(&self) -> usize {
        self.dense.len()
    }
}

// -0.0 and 0.0 must share a key
fn timestamp_key(timestamp: f64) -> u64 {
    (timestamp + 0.0).to_bits()
}

/// Sliding-window burst detector
#[derive(Debug, Clone, Copy)]
pub struct DensityAnalyzer {
    time_window: f64,
    dense_threshold: usize,
}

impl Default for DensityAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_WINDOW, DEFAULT_DENSE_THRESHOLD)
    }
}

impl DensityAnalyzer {
    pub fn new(time_window: f64, dense_threshold: usize) -> Self {
        Self {
            time_window,
            dense_threshold,
        }
    }

    pub fn dense_threshold(&self) -> usize {
        self.dense_threshold
    }

    /// Analyze timestamps sorted in ascending order.
    ///
    /// Every index `i` opens the window `[t[i], t[i] + time_window]`. The window
    /// end only moves forward, so the sweep is linear in the number of
    /// timestamps, and dense marking never revisits an already-marked index.
    pub fn analyze(&self, timestamps: &[f64]) -> DensityProfile {
        debug_assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));

        let mut profile = DensityProfile::default();
        let n = timestamps.len();
        let mut end = 0;
        let mut marked_until = 0;

        for i in 0..n {
            let window_end = timestamps[i] + self.time_window;
            if end < i {
                end = i;
            }
            while end < n && timestamps[end] <= window_end {
                end += 1;
            }

            let count = end - i;
            profile.max_density = profile.max_density.max(count);

            if count >= self.dense_threshold && self.dense_threshold > 0 {
                for &t in &timestamps[marked_until.max(i)..end] {
                    profile.dense.insert(timestamp_key(t));
                }
                marked_until = marked_until.max(end);
            }
        }

        profile
    }

    /// Sort a copy of the timestamps, then analyze
    pub fn analyze_unsorted(&self, timestamps: &[f64]) -> DensityProfile {
        let mut sorted = timestamps.to_vec();
        sorted.sort_by(f64::total_cmp);
        self.analyze(&sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let profile = DensityAnalyzer::default().analyze(&[]);
        assert_eq!(profile.max_density, 0);
        assert_eq!(profile.dense_count(), 0);
    }

    #[test]
    fn test_window_end_is_inclusive() {
        let profile = DensityAnalyzer::default().analyze(&[10.0, 15.0, 20.0, 130.0, 131.0]);
        assert_eq!(profile.max_density, 4);
        for t in [10.0, 15.0, 20.0, 130.0, 131.0] {
            assert!(profile.is_dense(t), "{} should be dense", t);
        }
    }

    #[test]
    fn test_sparse_occurrences_are_not_dense() {
        let profile = DensityAnalyzer::default().analyze(&[0.0, 200.0, 400.0, 600.0]);
        assert_eq!(profile.max_density, 1);
        assert_eq!(profile.dense_count(), 0);
    }

    #[test]
    fn test_only_clustered_timestamps_marked() {
        let profile = DensityAnalyzer::default().analyze(&[0.0, 300.0, 310.0, 320.0, 900.0]);
        assert_eq!(profile.max_density, 3);
        assert!(!profile.is_dense(0.0));
        assert!(profile.is_dense(300.0));
        assert!(profile.is_dense(310.0));
        assert!(profile.is_dense(320.0));
        assert!(!profile.is_dense(900.0));
    }

    #[test]
    fn test_duplicate_timestamps_counted() {
        let profile = DensityAnalyzer::default().analyze(&[5.0, 5.0, 5.0]);
        assert_eq!(profile.max_density, 3);
        assert!(profile.is_dense(5.0));
        assert_eq!(profile.dense_count(), 1);
    }

    #[test]
    fn test_overlapping_dense_windows_union() {
        let analyzer = DensityAnalyzer::new(10.0, 3);
        let profile = analyzer.analyze(&[0.0, 5.0, 10.0, 15.0, 20.0, 40.0]);
        assert_eq!(profile.max_density, 3);
        for t in [0.0, 5.0, 10.0, 15.0, 20.0] {
            assert!(profile.is_dense(t));
        }
        assert!(!profile.is_dense(40.0));
    }

    #[test]
    fn test_adding_inside_cluster_never_decreases_max_density() {
        let analyzer = DensityAnalyzer::default();
        let base = vec![10.0, 20.0, 30.0, 500.0];
        let before = analyzer.analyze(&base).max_density;

        for extra in [10.0, 15.0, 25.0, 30.0] {
            let mut grown = base.clone();
            grown.push(extra);
            let after = analyzer.analyze_unsorted(&grown).max_density;
            assert!(after >= before);
        }
    }

    #[test]
    fn test_matches_naive_scan() {
        let analyzer = DensityAnalyzer::new(30.0, 3);
        let timestamps = [1.0, 2.0, 3.0, 31.0, 33.0, 34.0, 35.0, 70.0, 100.0, 101.0, 131.0];

        let mut naive_max = 0;
        let mut naive_dense = Vec::new();
        for i in 0..timestamps.len() {
            let window: Vec<f64> = timestamps[i..]
                .iter()
                .copied()
                .take_while(|t| *t <= timestamps[i] + 30.0)
                .collect();
            naive_max = naive_max.max(window.len());
            if window.len() >= 3 {
                naive_dense.extend(window);
            }
        }

        let profile = analyzer.analyze(&timestamps);
        assert_eq!(profile.max_density, naive_max);
        for t in timestamps {
            assert_eq!(profile.is_dense(t), naive_dense.contains(&t), "mismatch at {}", t);
        }
    }
}
