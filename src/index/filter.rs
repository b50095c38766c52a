use std::collections::BTreeSet;
use tracing::debug;

use super::scorer::ScoredLemma;

/// Keeps lemmas whose total score clears `min_score`, plus any whitelisted lemma
#[derive(Debug, Clone, Default)]
pub struct ThresholdFilter {
    min_score: u32,
    whitelist: BTreeSet<String>,
}

impl ThresholdFilter {
    pub fn new(min_score: u32) -> Self {
        Self {
            min_score,
            whitelist: BTreeSet::new(),
        }
    }

    pub fn with_whitelist(mut self, whitelist: impl IntoIterator<Item = String>) -> Self {
        self.whitelist.extend(whitelist);
        self
    }

    pub fn min_score(&self) -> u32 {
        self.min_score
    }

    pub fn whitelist_len(&self) -> usize {
        self.whitelist.len()
    }

    pub fn retains(&self, lemma: &ScoredLemma) -> bool {
        lemma.score.total >= self.min_score || self.whitelist.contains(&lemma.lemma)
    }

    pub fn apply(&self, lemmas: Vec<ScoredLemma>) -> Vec<ScoredLemma> {
        lemmas
            .into_iter()
            .filter(|lemma| {
                let keep = self.retains(lemma);
                if !keep {
                    debug!("Dropping '{}' (score {} < {})", lemma.lemma, lemma.score.total, self.min_score);
                }
                keep
            })
            .collect()
    }
}
