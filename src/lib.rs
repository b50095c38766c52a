/// Vocab Video Indexer
///
/// Finds the vocabulary words a video actually teaches and builds a
/// timestamped, alphabet-sharded index so a learner can jump to the moment
/// each word is explained.

pub mod acquisition;
pub mod config;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod storage;
pub mod transcription;

// Re-export main types for easy access
pub use crate::acquisition::{LocalMediaScanner, MediaDownloader, MediaItem};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{AcquisitionError, IndexerError, TranscriptionError};
pub use crate::index::{
    MultiSignalScorer, OccurrenceCollector, RawOccurrence, ScoredOccurrence, TemporalDeduplicator, ThresholdFilter,
    WordIndex,
};
pub use crate::pipeline::{IndexingRun, Pipeline, RunReport, VideoOutcome};
pub use crate::storage::{IndexLayout, Platform, ShardStore, VideoMap};
pub use crate::transcription::{
    StaticTranscriber, TranscriptWord, Transcriber, TranscriptionCache, WhisperCliTranscriber,
};
