use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{IndexerError, Result};

pub const METADATA_VERSION: &str = "2.0";
pub const SHARDING_TYPE: &str = "alphabet";

/// Summary written next to the shards after every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Unix seconds
    pub generated_at: i64,
    pub total_videos: usize,
    /// Persisted occurrences after filtering and dedup
    pub total_words: usize,
    pub sharding_type: String,
    pub version: String,
    /// Acquisition and transcription chain that produced the index
    pub indexer: String,
}

impl IndexMetadata {
    pub fn new(total_videos: usize, total_words: usize, indexer: impl Into<String>) -> Self {
        Self {
            generated_at: chrono::Utc::now().timestamp(),
            total_videos,
            total_words,
            sharding_type: SHARDING_TYPE.to_string(),
            version: METADATA_VERSION.to_string(),
            indexer: indexer.into(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| IndexerError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
