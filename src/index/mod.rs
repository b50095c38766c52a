/// Taught-word detection engine
///
/// Converts per-video transcript tokens into a scored, deduplicated word index.
/// Stages run in a fixed order over one `WordIndex`:
/// collector -> density -> scorer -> filter -> dedup.

pub mod lemma;
pub mod collector;
pub mod density;
pub mod scorer;
pub mod filter;
pub mod dedup;

pub use collector::{CollectedVideo, OccurrenceCollector};
pub use dedup::TemporalDeduplicator;
pub use density::{DensityAnalyzer, DensityProfile};
pub use filter::ThresholdFilter;
pub use scorer::{LemmaScore, MultiSignalScorer, ScoredLemma};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One timestamped appearance of a lemma, before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOccurrence {
    /// Video the occurrence belongs to
    #[serde(rename = "v")]
    pub video_id: String,
    /// Seconds from the start of the video, one decimal place
    #[serde(rename = "t")]
    pub timestamp: f64,
    /// Surrounding words
    #[serde(rename = "c")]
    pub context: String,
}

impl RawOccurrence {
    pub fn new(video_id: impl Into<String>, timestamp: f64, context: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            timestamp: round_timestamp(timestamp),
            context: context.into(),
        }
    }

    /// Attach a score, producing the persisted shape
    pub fn with_score(self, score: u32) -> ScoredOccurrence {
        ScoredOccurrence {
            video_id: self.video_id,
            timestamp: self.timestamp,
            context: self.context,
            score,
        }
    }
}

/// An occurrence after scoring, as written to shard files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOccurrence {
    #[serde(rename = "v")]
    pub video_id: String,
    #[serde(rename = "t")]
    pub timestamp: f64,
    #[serde(rename = "c")]
    pub context: String,
    #[serde(rename = "s")]
    pub score: u32,
}

impl ScoredOccurrence {
    /// Drop the score so the occurrence can be re-scored with new data
    pub fn into_raw(self) -> RawOccurrence {
        RawOccurrence {
            video_id: self.video_id,
            timestamp: self.timestamp,
            context: self.context,
        }
    }
}

/// Anything positioned on a video timeline
pub trait Timed {
    fn timestamp(&self) -> f64;
    fn video_id(&self) -> &str;
    fn context(&self) -> &str;
}

impl Timed for RawOccurrence {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
    fn video_id(&self) -> &str {
        &self.video_id
    }
    fn context(&self) -> &str {
        &self.context
    }
}

impl Timed for ScoredOccurrence {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
    fn video_id(&self) -> &str {
        &self.video_id
    }
    fn context(&self) -> &str {
        &self.context
    }
}

/// Total order used wherever occurrences are sorted: time first, then a
/// stable tie-break so insertion order never leaks into results.
pub fn timeline_order<T: Timed>(a: &T, b: &T) -> Ordering {
    a.timestamp()
        .total_cmp(&b.timestamp())
        .then_with(|| a.video_id().cmp(b.video_id()))
        .then_with(|| a.context().cmp(b.context()))
}

/// Round seconds to one decimal place, clamping negatives to zero.
///
/// Rounds the exact binary value with ties to even, so `0.25` becomes `0.2`
/// and `0.35` (stored as `0.3499...`) becomes `0.3`, matching the values the
/// legacy Python indexer wrote with `round(x, 1)`.
pub fn round_timestamp(seconds: f64) -> f64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0.0;
    }
    format!("{:.1}", seconds)
        .parse()
        .unwrap_or_else(|_| (seconds * 10.0).round() / 10.0)
}

/// Lemma -> occurrences for one indexing run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordIndex {
    entries: BTreeMap<String, Vec<RawOccurrence>>,
}

impl WordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, lemma: &str, occurrence: RawOccurrence) {
        self.entries
            .entry(lemma.to_string())
            .or_default()
            .push(occurrence);
    }

    pub fn extend_lemma(&mut self, lemma: &str, occurrences: impl IntoIterator<Item = RawOccurrence>) {
        self.entries
            .entry(lemma.to_string())
            .or_default()
            .extend(occurrences);
    }

    /// Fold another (per-video) index into this one
    pub fn merge(&mut self, other: WordIndex) {
        for (lemma, occurrences) in other.entries {
            self.entries.entry(lemma).or_default().extend(occurrences);
        }
    }

    pub fn get(&self, lemma: &str) -> Option<&[RawOccurrence]> {
        self.entries.get(lemma).map(Vec::as_slice)
    }

    pub fn contains(&self, lemma: &str) -> bool {
        self.entries.contains_key(lemma)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<RawOccurrence>)> {
        self.entries.iter()
    }

    /// Number of distinct lemmas
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total occurrences across all lemmas
    pub fn occurrence_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Lemmas ordered by descending occurrence count, then alphabetically
    pub fn most_frequent(&self, limit: usize) -> Vec<(&str, usize, f64)> {
        let mut ranked: Vec<(&str, usize, f64)> = self
            .entries
            .iter()
            .map(|(lemma, occs)| {
                let first = occs
                    .iter()
                    .map(|o| o.timestamp)
                    .fold(f64::INFINITY, f64::min);
                (lemma.as_str(), occs.len(), first)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }
}

impl IntoIterator for WordIndex {
    type Item = (String, Vec<RawOccurrence>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<RawOccurrence>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
