use super::density::DensityAnalyzer;
use super::{RawOccurrence, ScoredOccurrence, WordIndex};

/// Intrinsic weight of every occurrence
pub const OCCURRENCE_BASE_SCORE: u32 = 1;
/// Context contains an explicit vocabulary explanation
pub const DIDACTIC_BONUS: u32 = 5;
/// Context switches into CJK text
pub const CJK_BONUS: u32 = 2;
/// Occurrence sits in a dense window (occurrence score only)
pub const DENSE_OCCURRENCE_BONUS: u32 = 2;
/// Multiplier applied to max density for the lemma-level bonus
pub const DENSITY_MULTIPLIER: u32 = 2;

/// Phrases that signal a word is being explained rather than merely used
pub fn default_didactic_markers() -> Vec<String> {
    [
        // Mandarin teaching phrases
        "这个单词", "单词叫做", "单词是", "意思是", "叫", "翻译成", "什么意思",
        "怎么来记", "看这个词", "读一下", "再读一遍", "什么鬼", "怎么讲",
        // English equivalents
        "this word means", "the word means", "which means", "pronounced as",
        "translates to", "is called", "spelled",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// True for characters in the CJK Unified Ideographs block
pub fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Score breakdown for one lemma
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LemmaScore {
    pub occurrences: usize,
    pub max_density: usize,
    pub base: u32,
    pub density_bonus: u32,
    pub didactic_bonus: u32,
    pub cjk_bonus: u32,
    pub total: u32,
}

/// A lemma with its aggregate score and scored occurrences
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLemma {
    pub lemma: String,
    pub score: LemmaScore,
    pub occurrences: Vec<ScoredOccurrence>,
}

/// Combines frequency, burst density, didactic phrasing and code-switching
#[derive(Debug, Clone)]
pub struct MultiSignalScorer {
    analyzer: DensityAnalyzer,
    markers: Vec<String>,
}

impl Default for MultiSignalScorer {
    fn default() -> Self {
        Self::new(DensityAnalyzer::default(), default_didactic_markers())
    }
}

impl MultiSignalScorer {
    pub fn new(analyzer: DensityAnalyzer, markers: Vec<String>) -> Self {
        let markers = markers
            .into_iter()
            .map(|m| m.to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { analyzer, markers }
    }

    pub fn has_didactic_marker(&self, context: &str) -> bool {
        let lowered = context.to_lowercase();
        self.markers.iter().any(|m| lowered.contains(m.as_str()))
    }

    pub fn has_cjk(context: &str) -> bool {
        context.chars().any(is_cjk_ideograph)
    }

    /// Score every occurrence of one lemma.
    ///
    /// The density bonus lands on the lemma total once, while the per-occurrence
    /// dense flag raises only that occurrence's score. Didactic and CJK bonuses
    /// count toward both.
    pub fn score_lemma(&self, lemma: &str, occurrences: Vec<RawOccurrence>) -> ScoredLemma {
        let mut timestamps: Vec<f64> = occurrences.iter().map(|o| o.timestamp).collect();
        timestamps.sort_by(f64::total_cmp);
        let profile = self.analyzer.analyze(&timestamps);

        let base = occurrences.len() as u32;
        let density_bonus = if profile.max_density >= self.analyzer.dense_threshold() {
            profile.max_density as u32 * DENSITY_MULTIPLIER
        } else {
            0
        };

        let mut didactic_bonus = 0;
        let mut cjk_bonus = 0;
        let mut scored = Vec::with_capacity(occurrences.len());

        for occ in occurrences {
            let mut occ_score = OCCURRENCE_BASE_SCORE;

            if self.has_didactic_marker(&occ.context) {
                occ_score += DIDACTIC_BONUS;
                didactic_bonus += DIDACTIC_BONUS;
            }

            if Self::has_cjk(&occ.context) {
                occ_score += CJK_BONUS;
                cjk_bonus += CJK_BONUS;
            }

            if profile.is_dense(occ.timestamp) {
                occ_score += DENSE_OCCURRENCE_BONUS;
            }

            scored.push(occ.with_score(occ_score));
        }

        ScoredLemma {
            lemma: lemma.to_string(),
            score: LemmaScore {
                occurrences: scored.len(),
                max_density: profile.max_density,
                base,
                density_bonus,
                didactic_bonus,
                cjk_bonus,
                total: base + density_bonus + didactic_bonus + cjk_bonus,
            },
            occurrences: scored,
        }
    }

    /// Score every lemma in the index, in lemma order
    pub fn score_index(&self, index: WordIndex) -> Vec<ScoredLemma> {
        index
            .into_iter()
            .filter(|(_, occs)| !occs.is_empty())
            .map(|(lemma, occs)| self.score_lemma(&lemma, occs))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(timestamps: &[f64]) -> Vec<RawOccurrence> {
        timestamps
            .iter()
            .map(|t| RawOccurrence::new("v1", *t, "we eat an apple today"))
            .collect()
    }

    #[test]
    fn test_score_composition_base_plus_density() {
        // 4 occurrences inside one 120s window plus one far away
        let scored = MultiSignalScorer::default().score_lemma("apple", plain(&[0.0, 30.0, 60.0, 90.0, 1000.0]));

        assert_eq!(scored.score.max_density, 4);
        assert_eq!(scored.score.base, 5);
        assert_eq!(scored.score.density_bonus, 8);
        assert_eq!(scored.score.total, 13);
    }

    #[test]
    fn test_below_dense_threshold_no_density_bonus() {
        let scored = MultiSignalScorer::default().score_lemma("apple", plain(&[0.0, 10.0, 500.0]));
        assert_eq!(scored.score.max_density, 2);
        assert_eq!(scored.score.density_bonus, 0);
        assert_eq!(scored.score.total, 3);
        assert!(scored.occurrences.iter().all(|o| o.score == 1));
    }

    #[test]
    fn test_dense_flag_raises_occurrence_score_only() {
        let scored = MultiSignalScorer::default().score_lemma("apple", plain(&[0.0, 10.0, 20.0, 800.0]));

        let by_time: Vec<(f64, u32)> = scored.occurrences.iter().map(|o| (o.timestamp, o.score)).collect();
        assert_eq!(by_time, vec![(0.0, 3), (10.0, 3), (20.0, 3), (800.0, 1)]);
        // base 4 + density 3*2, dense flags are not added to the total
        assert_eq!(scored.score.total, 10);
    }

    #[test]
    fn test_didactic_and_cjk_bonuses_count_twice() {
        let occurrences = vec![
            RawOccurrence::new("v1", 5.0, "这个单词 abandon 意思是 放弃"),
            RawOccurrence::new("v1", 500.0, "they abandon the ship"),
        ];
        let scored = MultiSignalScorer::default().score_lemma("abandon", occurrences);

        assert_eq!(scored.occurrences[0].score, 1 + 5 + 2);
        assert_eq!(scored.occurrences[1].score, 1);
        assert_eq!(scored.score.didactic_bonus, 5);
        assert_eq!(scored.score.cjk_bonus, 2);
        assert_eq!(scored.score.total, 2 + 5 + 2);
    }

    #[test]
    fn test_english_marker_is_case_insensitive() {
        let scorer = MultiSignalScorer::default();
        assert!(scorer.has_didactic_marker("So This Word Means to give up"));
        assert!(!scorer.has_didactic_marker("nothing to see here"));
    }

    #[test]
    fn test_cjk_detection_bounds() {
        assert!(MultiSignalScorer::has_cjk("apple 苹果"));
        assert!(!MultiSignalScorer::has_cjk("りんご"));
        assert!(!MultiSignalScorer::has_cjk("apple"));
    }

    #[test]
    fn test_insertion_order_does_not_change_scores() {
        let scorer = MultiSignalScorer::default();
        let forward = scorer.score_lemma("apple", plain(&[10.0, 15.0, 20.0, 130.0, 131.0]));
        let backward = scorer.score_lemma("apple", plain(&[131.0, 130.0, 20.0, 15.0, 10.0]));

        assert_eq!(forward.score, backward.score);
        let mut a: Vec<_> = forward.occurrences.iter().map(|o| (o.timestamp, o.score)).collect();
        let mut b: Vec<_> = backward.occurrences.iter().map(|o| (o.timestamp, o.score)).collect();
        a.sort_by(|x, y| x.0.total_cmp(&y.0));
        b.sort_by(|x, y| x.0.total_cmp(&y.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_markers() {
        let scorer = MultiSignalScorer::new(DensityAnalyzer::default(), vec!["Vocab:".to_string(), String::new()]);
        assert!(scorer.has_didactic_marker("vocab: apple"));
        assert!(!scorer.has_didactic_marker("这个单词"));
    }
}
