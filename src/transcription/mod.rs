pub mod cache;
pub mod whisper;

pub use cache::{CachedTranscription, TranscriptionCache};
pub use whisper::WhisperCliTranscriber;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::TranscriptionError;

/// One timed word produced by speech recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub word: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    #[serde(default)]
    pub end: f64,
}

impl TranscriptWord {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }
}

/// Speech-to-text backend producing word-level timings
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media_path: &Path) -> Result<Vec<TranscriptWord>, TranscriptionError>;

    fn backend_name(&self) -> &str;
}

/// Serves fixed transcripts keyed by media path
#[derive(Debug, Clone, Default)]
pub struct StaticTranscriber {
    transcripts: HashMap<PathBuf, Vec<TranscriptWord>>,
}

impl StaticTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(mut self, media_path: impl Into<PathBuf>, words: Vec<TranscriptWord>) -> Self {
        self.transcripts.insert(media_path.into(), words);
        self
    }
}

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, media_path: &Path) -> Result<Vec<TranscriptWord>, TranscriptionError> {
        self.transcripts
            .get(media_path)
            .cloned()
            .ok_or_else(|| TranscriptionError::Missing(media_path.display().to_string()))
    }

    fn backend_name(&self) -> &str {
        "static"
    }
}
