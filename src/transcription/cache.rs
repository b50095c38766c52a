/// Versioned on-disk cache of transcription results
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::TranscriptWord;

/// Bump when the cached word format changes; older files become misses
pub const CACHE_VERSION: &str = "3.0";

const CACHE_SUFFIX: &str = ".transcription.json";

/// Descriptive fields stored alongside cached words
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Cache file payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedTranscription {
    pub version: String,
    #[serde(default)]
    pub info: CacheInfo,
    pub words: Vec<TranscriptWord>,
}

/// Manages transcription cache files
#[derive(Debug, Clone)]
pub struct TranscriptionCache {
    /// Central cache directory; `None` stores each cache next to its media file
    cache_dir: Option<PathBuf>,
    /// Expected version tag
    version: String,
}

impl Default for TranscriptionCache {
    fn default() -> Self {
        Self::new(None, CACHE_VERSION)
    }
}

impl TranscriptionCache {
    pub fn new(cache_dir: Option<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            cache_dir,
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Create the central cache directory if one is configured
    pub async fn initialize(&self) -> Result<()> {
        if let Some(dir) = &self.cache_dir {
            tokio::fs::create_dir_all(dir).await?;
            info!("📁 Transcription cache directory initialized: {}", dir.display());
        }
        Ok(())
    }

    /// Location of the cache file for a media file
    pub fn cache_path(&self, media_path: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => {
                let digest = md5::compute(media_path.to_string_lossy().as_bytes());
                dir.join(format!("{:x}{}", digest, CACHE_SUFFIX))
            }
            None => {
                let mut name = media_path.as_os_str().to_os_string();
                name.push(CACHE_SUFFIX);
                PathBuf::from(name)
            }
        }
    }

    /// Load cached words. Missing, unreadable or stale files are all misses.
    pub async fn load(&self, media_path: &Path) -> Option<CachedTranscription> {
        let cache_path = self.cache_path(media_path);

        if !cache_path.exists() {
            debug!("Cache miss: no file for {}", media_path.display());
            return None;
        }

        let content = match tokio::fs::read_to_string(&cache_path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Error reading cache {}: {}, will re-transcribe", cache_path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<CachedTranscription>(&content) {
            Ok(cached) if cached.version == self.version => {
                info!("📚 Cache hit: {} words for {}", cached.words.len(), media_path.display());
                Some(cached)
            }
            Ok(cached) => {
                info!("⏰ Cache version mismatch ({} != {}), will re-transcribe", cached.version, self.version);
                None
            }
            Err(e) => {
                warn!("Error parsing cache {}: {}, will re-transcribe", cache_path.display(), e);
                None
            }
        }
    }

    /// Save words right after a successful transcription
    pub async fn save(&self, media_path: &Path, words: &[TranscriptWord], title: Option<&str>) -> Result<PathBuf> {
        let cache_path = self.cache_path(media_path);
        if let Some(parent) = cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let payload = CachedTranscription {
            version: self.version.clone(),
            info: CacheInfo {
                title: title.map(str::to_string),
            },
            words: words.to_vec(),
        };

        let json_content = serde_json::to_string_pretty(&payload)?;
        tokio::fs::write(&cache_path, json_content).await?;
        info!("💾 Saved transcription cache: {}", cache_path.display());

        Ok(cache_path)
    }

    /// Remove the cache file for one media file
    pub async fn invalidate(&self, media_path: &Path) -> Result<bool> {
        let cache_path = self.cache_path(media_path);

        if cache_path.exists() {
            tokio::fs::remove_file(&cache_path).await?;
            info!("🗑️ Invalidated cache for: {}", media_path.display());
            Ok(true)
        } else {
            debug!("Cache file not found for: {}", media_path.display());
            Ok(false)
        }
    }

    /// Describe every cache file found in `dir`
    pub async fn list_entries(&self, dir: &Path) -> Result<Vec<CacheEntryInfo>> {
        let mut listed = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_cache_file(&path) {
                continue;
            }

            let parsed = match tokio::fs::read_to_string(&path).await {
                Ok(content) => serde_json::from_str::<CachedTranscription>(&content).ok(),
                Err(_) => None,
            };

            listed.push(match parsed {
                Some(cached) => CacheEntryInfo {
                    is_current: cached.version == self.version,
                    version: Some(cached.version),
                    title: cached.info.title,
                    word_count: cached.words.len(),
                    path,
                },
                None => CacheEntryInfo {
                    path,
                    version: None,
                    title: None,
                    word_count: 0,
                    is_current: false,
                },
            });
        }

        listed.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(listed)
    }

    /// Summarize the cache files in `dir`
    pub async fn stats(&self, dir: &Path) -> Result<CacheStats> {
        let entries = self.list_entries(dir).await?;
        let mut stats = CacheStats::default();

        for entry in &entries {
            stats.total_files += 1;
            match (&entry.version, entry.is_current) {
                (Some(_), true) => {
                    stats.current_files += 1;
                    stats.total_words += entry.word_count;
                }
                (Some(_), false) => stats.stale_files += 1,
                (None, _) => stats.corrupt_files += 1,
            }
        }

        Ok(stats)
    }

    /// Delete stale or unreadable cache files in `dir`
    pub async fn prune(&self, dir: &Path) -> Result<usize> {
        let mut removed = 0;
        for entry in self.list_entries(dir).await? {
            if !entry.is_current && tokio::fs::remove_file(&entry.path).await.is_ok() {
                removed += 1;
                debug!("🗑️ Pruned cache file: {}", entry.path.display());
            }
        }
        Ok(removed)
    }

    /// Delete every cache file in `dir`
    pub async fn clear(&self, dir: &Path) -> Result<usize> {
        let mut cleared = 0;
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_cache_file(&path) && tokio::fs::remove_file(&path).await.is_ok() {
                cleared += 1;
                debug!("🗑️ Removed cache file: {}", path.display());
            }
        }

        if cleared > 0 {
            info!("🧹 Cleared {} cache files", cleared);
        }
        Ok(cleared)
    }
}

fn is_cache_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.ends_with(CACHE_SUFFIX))
}

/// One cache file as seen by the cache manager
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub path: PathBuf,
    pub version: Option<String>,
    pub title: Option<String>,
    pub word_count: usize,
    pub is_current: bool,
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    pub total_files: usize,
    pub current_files: usize,
    pub stale_files: usize,
    pub corrupt_files: usize,
    pub total_words: usize,
}
