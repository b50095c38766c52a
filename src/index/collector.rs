use tracing::debug;

use super::lemma::extract_lemmas;
use super::{RawOccurrence, WordIndex};
use crate::transcription::TranscriptWord;

/// Words taken on each side of a token when building its context
pub const DEFAULT_CONTEXT_RADIUS: usize = 5;

/// Occurrences gathered from a single video
#[derive(Debug, Clone, Default)]
pub struct CollectedVideo {
    pub video_id: String,
    pub index: WordIndex,
    pub occurrences: usize,
}

/// Builds per-lemma occurrence lists from a word-level transcript
#[derive(Debug, Clone)]
pub struct OccurrenceCollector {
    context_radius: usize,
}

impl Default for OccurrenceCollector {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_RADIUS)
    }
}

impl OccurrenceCollector {
    pub fn new(context_radius: usize) -> Self {
        Self { context_radius }
    }

    /// Collect one video's transcript into a fresh partial index.
    ///
    /// Tokens that yield no acceptable lemma are skipped silently.
    pub fn collect(&self, video_id: &str, words: &[TranscriptWord]) -> CollectedVideo {
        let mut index = WordIndex::new();
        let mut occurrences = 0;

        for (i, word) in words.iter().enumerate() {
            let lemmas = extract_lemmas(&word.word);
            if lemmas.is_empty() {
                continue;
            }

            let context = self.context_around(words, i);
            for lemma in lemmas {
                index.push(&lemma, RawOccurrence::new(video_id, word.start, context.clone()));
                occurrences += 1;
            }
        }

        debug!("Collected {} occurrences of {} lemmas from {}", occurrences, index.len(), video_id);

        CollectedVideo {
            video_id: video_id.to_string(),
            index,
            occurrences,
        }
    }

    fn context_around(&self, words: &[TranscriptWord], position: usize) -> String {
        let start = position.saturating_sub(self.context_radius);
        let end = (position + self.context_radius + 1).min(words.len());
        words[start..end]
            .iter()
            .map(|w| w.word.trim())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
