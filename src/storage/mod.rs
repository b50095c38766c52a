//! Persisted index files: shards, video map, metadata and the failure log

pub mod failures;
pub mod metadata;
pub mod shards;
pub mod video_map;

pub use failures::{FailedVideo, FailureLog, FailureLogUpdate};
pub use metadata::IndexMetadata;
pub use shards::{shard_key, LoadedShards, ShardStore};
pub use video_map::{VideoEntry, VideoMap};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Video source. Decides file naming and the default score threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Bilibili,
    Youtube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Bilibili => "bilibili",
            Platform::Youtube => "youtube",
        }
    }

    /// Threshold used when none is configured
    pub fn default_min_score(&self) -> u32 {
        match self {
            Platform::Bilibili => 3,
            Platform::Youtube => 15,
        }
    }

    /// Bilibili output predates platform tags and keeps the untagged names
    fn file_tag(&self) -> Option<&'static str> {
        match self {
            Platform::Bilibili => None,
            Platform::Youtube => Some("youtube"),
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Bilibili
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bilibili" | "bili" => Ok(Platform::Bilibili),
            "youtube" | "yt" => Ok(Platform::Youtube),
            other => Err(format!("unknown platform '{}', expected bilibili or youtube", other)),
        }
    }
}

/// File names of every artifact in one output directory
#[derive(Debug, Clone)]
pub struct IndexLayout {
    output_dir: PathBuf,
    platform: Platform,
}

impl IndexLayout {
    pub fn new(output_dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            output_dir: output_dir.into(),
            platform,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn tagged(&self, stem: &str) -> String {
        match self.platform.file_tag() {
            Some(tag) => format!("{}_{}", stem, tag),
            None => stem.to_string(),
        }
    }

    /// Prefix shared by every shard file, e.g. `index_youtube_`
    pub fn shard_prefix(&self) -> String {
        format!("{}_", self.tagged("index"))
    }

    pub fn shard_path(&self, key: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}.json", self.shard_prefix(), key))
    }

    pub fn video_map_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.tagged("video_map")))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.tagged("metadata")))
    }

    pub fn failure_log_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.tagged("failed_videos")))
    }
}
