use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use super::Platform;
use crate::error::{IndexerError, Result};

/// What the frontend needs to locate and label a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub title: String,
    /// Platform-native id (BV id on bilibili, video id on youtube)
    #[serde(default)]
    pub bvid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Part number for multi-part uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default)]
    pub filename: String,
}

/// video id -> entry. Entries are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoMap {
    entries: BTreeMap<String, VideoEntry>,
}

impl VideoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a map from disk. A missing or corrupt file yields an empty map.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::new();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(IndexerError::from)
            .and_then(|content| {
                serde_json::from_str::<VideoMap>(&content).map_err(|source| IndexerError::Json {
                    path: path.to_path_buf(),
                    source,
                })
            });

        match parsed {
            Ok(map) => {
                info!("✅ Loaded video map ({} videos)", map.len());
                map
            }
            Err(e) => {
                warn!("⚠️ Could not read video map {}: {}, starting empty", path.display(), e);
                Self::new()
            }
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

    pub fn contains(&self, video_id: &str) -> bool {
        self.entries.contains_key(video_id)
    }

    pub fn get(&self, video_id: &str) -> Option<&VideoEntry> {
        self.entries.get(video_id)
    }

    /// Add an entry unless the id is already known. Returns whether it was added.
    pub fn insert(&mut self, video_id: impl Into<String>, entry: VideoEntry) -> bool {
        use std::collections::btree_map::Entry;
        match self.entries.entry(video_id.into()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VideoEntry)> {
        self.entries.iter()
    }
}
