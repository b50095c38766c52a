use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::index::density::{DEFAULT_DENSE_THRESHOLD, DEFAULT_TIME_WINDOW};
use crate::index::collector::DEFAULT_CONTEXT_RADIUS;
use crate::index::dedup::DEFAULT_DEDUP_GAP;
use crate::index::scorer::default_didactic_markers;
use crate::storage::Platform;
use crate::transcription::cache::CACHE_VERSION;

/// Primes whisper for Chinese narration with English vocabulary
pub const DEFAULT_INITIAL_PROMPT: &str = "这是一段包含English单词的中文讲解视频。";

/// Configuration for the vocabulary video indexer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Detection and scoring parameters
    pub indexing: IndexingConfig,

    /// Where and how the index is written
    pub output: OutputConfig,

    /// Speech-to-text settings
    pub transcription: TranscriptionConfig,

    /// Media download and discovery
    pub acquisition: AcquisitionConfig,

    /// Transcription cache settings
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Minimum lemma score; the platform default applies when unset
    pub min_score: Option<u32>,

    /// Density window in seconds
    pub time_window: f64,

    /// Occurrences in one window that make a burst
    pub dense_threshold: usize,

    /// Minimum gap between persisted occurrences of a lemma
    pub dedup_gap: f64,

    /// Words on each side of an occurrence kept as context
    pub context_radius: usize,

    /// Phrases that mark an explicit vocabulary explanation
    pub didactic_markers: Vec<String>,

    /// Rows in the pre-filter top words log
    pub top_words_report: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving shards, video map and metadata
    pub output_dir: PathBuf,

    /// Platform naming scheme for output files
    pub platform: Platform,

    /// Merge with existing shards instead of starting fresh
    pub incremental: bool,

    /// Default tracing filter
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper model name
    pub model: String,

    /// Spoken language passed to whisper; `None` lets whisper detect it
    pub language: Option<String>,

    /// Decoding prompt that primes whisper for mixed Chinese/English speech
    pub initial_prompt: Option<String>,

    /// Per-command timeout in seconds
    pub timeout_secs: u64,

    /// Scratch directory for extracted audio
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Directory holding downloaded or local media
    pub media_dir: PathBuf,

    /// Source URLs (video or playlist) to download before indexing
    pub urls: Vec<String>,

    /// Media file extensions picked up by the scanner
    pub supported_extensions: Vec<String>,

    /// Attempts per download
    pub max_retries: u32,

    /// Pause between download attempts in seconds
    pub retry_delay_secs: u64,

    /// Timeout for each downloader invocation in seconds
    pub download_timeout_secs: u64,

    /// Index only what is already in `media_dir`
    pub skip_download: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Reuse cached transcriptions
    pub enabled: bool,

    /// Central cache directory; caches sit next to media files when unset
    pub cache_dir: Option<PathBuf>,

    /// Cache format version; other versions are ignored
    pub version: String,
}

impl IndexingConfig {
    /// Threshold for this run
    pub fn effective_min_score(&self, platform: Platform) -> u32 {
        self.min_score.unwrap_or_else(|| platform.default_min_score())
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "vocab-indexer.toml",
            "config/vocab-indexer.toml",
            "/etc/vocab-indexer/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config.apply_env());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load a specific configuration file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Invalid config {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config.apply_env())
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().apply_env())
    }

    fn apply_env(mut self) -> Self {
        if let Ok(dir) = std::env::var("VOCAB_INDEXER_OUTPUT_DIR") {
            self.output.output_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("VOCAB_INDEXER_MEDIA_DIR") {
            self.acquisition.media_dir = PathBuf::from(dir);
        }

        if let Ok(platform) = std::env::var("VOCAB_INDEXER_PLATFORM") {
            match platform.parse() {
                Ok(platform) => self.output.platform = platform,
                Err(e) => tracing::warn!("Ignoring VOCAB_INDEXER_PLATFORM: {}", e),
            }
        }

        if let Ok(score) = std::env::var("VOCAB_INDEXER_MIN_SCORE") {
            match score.parse() {
                Ok(score) => self.indexing.min_score = Some(score),
                Err(_) => tracing::warn!("Ignoring non-numeric VOCAB_INDEXER_MIN_SCORE: {}", score),
            }
        }

        if let Ok(model) = std::env::var("VOCAB_INDEXER_MODEL") {
            self.transcription.model = model;
        }

        if let Ok(dir) = std::env::var("VOCAB_INDEXER_CACHE_DIR") {
            self.cache.cache_dir = Some(PathBuf::from(dir));
        }

        if let Ok(log_level) = std::env::var("VOCAB_INDEXER_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let indexing = &self.indexing;
        if !(indexing.time_window.is_finite() && indexing.time_window > 0.0) {
            return Err(anyhow!("time_window must be a positive number of seconds"));
        }

        if indexing.dense_threshold == 0 {
            return Err(anyhow!("dense_threshold must be greater than 0"));
        }

        if !(indexing.dedup_gap.is_finite() && indexing.dedup_gap >= 0.0) {
            return Err(anyhow!("dedup_gap must be zero or a positive number of seconds"));
        }

        if self.transcription.timeout_secs == 0 {
            return Err(anyhow!("transcription timeout must be greater than 0"));
        }

        if self.acquisition.supported_extensions.is_empty() {
            return Err(anyhow!("at least one supported media extension is required"));
        }

        if self.acquisition.max_retries == 0 {
            return Err(anyhow!("max_retries must be greater than 0"));
        }

        if self.cache.version.trim().is_empty() {
            return Err(anyhow!("cache version must not be empty"));
        }

        if !self.output.output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&self.output.output_dir) {
                return Err(anyhow!("Cannot create output directory: {}", e));
            }
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Vocab Indexer Configuration:\n\
            - Platform: {}\n\
            - Output Directory: {}\n\
            - Media Directory: {}\n\
            - Incremental: {}\n\
            - Min Score: {}\n\
            - Density: {} in {}s, dedup gap {}s\n\
            - Whisper Model: {}\n\
            - Cache: {}",
            self.output.platform,
            self.output.output_dir.display(),
            self.acquisition.media_dir.display(),
            self.output.incremental,
            self.indexing.effective_min_score(self.output.platform),
            self.indexing.dense_threshold,
            self.indexing.time_window,
            self.indexing.dedup_gap,
            self.transcription.model,
            if self.cache.enabled {
                format!("v{}", self.cache.version)
            } else {
                "disabled".to_string()
            }
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indexing: IndexingConfig {
                min_score: None,
                time_window: DEFAULT_TIME_WINDOW,
                dense_threshold: DEFAULT_DENSE_THRESHOLD,
                dedup_gap: DEFAULT_DEDUP_GAP,
                context_radius: DEFAULT_CONTEXT_RADIUS,
                didactic_markers: default_didactic_markers(),
                top_words_report: 30,
            },
            output: OutputConfig {
                output_dir: PathBuf::from("./public/data"),
                platform: Platform::default(),
                incremental: false,
                log_level: "info".to_string(),
            },
            transcription: TranscriptionConfig::default(),
            acquisition: AcquisitionConfig {
                media_dir: PathBuf::from("./temp_video"),
                urls: Vec::new(),
                supported_extensions: ["mp4", "flv", "mkv", "mov", "webm", "wav", "mp3", "m4a"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                max_retries: 3,
                retry_delay_secs: 5,
                download_timeout_secs: 1800,
                skip_download: false,
            },
            cache: CacheConfig {
                enabled: true,
                cache_dir: None,
                version: CACHE_VERSION.to_string(),
            },
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "medium".to_string(),
            language: None,
            initial_prompt: Some(DEFAULT_INITIAL_PROMPT.to_string()),
            timeout_secs: 3600,
            work_dir: None,
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output.output_dir = dir.into();
        self
    }

    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.acquisition.media_dir = dir.into();
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.config.output.platform = platform;
        self
    }

    pub fn with_min_score(mut self, min_score: u32) -> Self {
        self.config.indexing.min_score = Some(min_score);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.transcription.model = model.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache.cache_dir = Some(dir.into());
        self
    }

    pub fn incremental(mut self, enable: bool) -> Self {
        self.config.output.incremental = enable;
        self
    }

    pub fn skip_download(mut self, skip: bool) -> Self {
        self.config.acquisition.skip_download = skip;
        self
    }

    pub fn enable_caching(mut self, enable: bool) -> Self {
        self.config.cache.enabled = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
