use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::acquisition::{LocalMediaScanner, MediaDownloader, MediaItem};
use crate::config::Config;
use crate::error::{IndexerError, TranscriptionError};
use crate::index::{
    DensityAnalyzer, MultiSignalScorer, OccurrenceCollector, ScoredLemma, TemporalDeduplicator, ThresholdFilter,
    WordIndex,
};
use crate::storage::{FailedVideo, FailureLog, IndexLayout, IndexMetadata, Platform, ShardStore, VideoMap};
use crate::transcription::{TranscriptWord, Transcriber, TranscriptionCache};

/// Why a video was not indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Already present in the loaded video map
    AlreadyIndexed,
    /// Same id seen earlier in this run
    DuplicateInRun,
}

/// Result of handling one video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VideoOutcome {
    Indexed {
        video_id: String,
        occurrences: usize,
        from_cache: bool,
    },
    Skipped {
        video_id: String,
        reason: SkipReason,
    },
    Failed(FailedVideo),
}

/// Counters for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub videos_seen: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub download_failures: usize,
    pub lemmas_loaded: usize,
    pub lemmas_collected: usize,
    pub lemmas_retained: usize,
    pub occurrences_collected: usize,
    pub occurrences_retained: usize,
    pub occurrences_persisted: usize,
    pub shards_written: usize,
    pub total_videos: usize,
    pub duration: Duration,
}

impl RunReport {
    fn record(&mut self, outcome: &VideoOutcome) {
        self.videos_seen += 1;
        match outcome {
            VideoOutcome::Indexed { from_cache, .. } => {
                self.indexed += 1;
                if *from_cache {
                    self.cache_hits += 1;
                }
            }
            VideoOutcome::Skipped { .. } => self.skipped += 1,
            VideoOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn log_summary(&self) {
        info!("📊 Run summary:");
        info!(
            "   Videos: {} seen, {} indexed ({} from cache), {} skipped, {} failed",
            self.videos_seen, self.indexed, self.cache_hits, self.skipped, self.failed
        );
        if self.download_failures > 0 {
            warn!("   Downloads failed: {}", self.download_failures);
        }
        info!(
            "   Words: {} -> {} (filtered {} auxiliary words)",
            self.lemmas_collected,
            self.lemmas_retained,
            self.lemmas_collected.saturating_sub(self.lemmas_retained)
        );
        info!(
            "   Occurrences: {} -> {} -> {} after dedup",
            self.occurrences_collected, self.occurrences_retained, self.occurrences_persisted
        );
        info!(
            "   Shards written: {}, videos in map: {}, took {:.1}s",
            self.shards_written,
            self.total_videos,
            self.duration.as_secs_f64()
        );
    }
}

/// One indexing run. Owns the working index, the video map and the whitelist
/// from load until the final write.
pub struct IndexingRun {
    layout: IndexLayout,
    store: ShardStore,
    index: WordIndex,
    video_map: VideoMap,
    whitelist: BTreeSet<String>,
    seen_this_run: HashSet<String>,
    collector: OccurrenceCollector,
    scorer: MultiSignalScorer,
    filter: ThresholdFilter,
    deduplicator: TemporalDeduplicator,
    transcriber: Arc<dyn Transcriber>,
    cache: Option<TranscriptionCache>,
    incremental: bool,
    retry_mode: bool,
    top_words_report: usize,
    indexer_label: String,
    failures: Vec<FailedVideo>,
    report: RunReport,
    started: Instant,
}

impl IndexingRun {
    pub fn new(config: &Config, transcriber: Arc<dyn Transcriber>) -> Self {
        let platform = config.output.platform;
        let layout = IndexLayout::new(&config.output.output_dir, platform);
        let indexing = &config.indexing;

        let cache = config
            .cache
            .enabled
            .then(|| TranscriptionCache::new(config.cache.cache_dir.clone(), config.cache.version.clone()));

        let tool = match platform {
            Platform::Youtube => "yt-dlp",
            Platform::Bilibili => "you-get",
        };
        let indexer_label = format!("{} + {}", tool, transcriber.backend_name());

        Self {
            store: ShardStore::new(layout.clone()),
            layout,
            index: WordIndex::new(),
            video_map: VideoMap::new(),
            whitelist: BTreeSet::new(),
            seen_this_run: HashSet::new(),
            collector: OccurrenceCollector::new(indexing.context_radius),
            scorer: MultiSignalScorer::new(
                DensityAnalyzer::new(indexing.time_window, indexing.dense_threshold),
                indexing.didactic_markers.clone(),
            ),
            filter: ThresholdFilter::new(indexing.effective_min_score(platform)),
            deduplicator: TemporalDeduplicator::new(indexing.dedup_gap),
            transcriber,
            cache,
            incremental: config.output.incremental,
            retry_mode: false,
            top_words_report: indexing.top_words_report,
            indexer_label,
            failures: Vec::new(),
            report: RunReport::default(),
            started: Instant::now(),
        }
    }

    /// Retry runs merge into the existing index so retried videos are added,
    /// not written over everything else
    pub fn with_retry_mode(mut self, retry_mode: bool) -> Self {
        self.retry_mode = retry_mode;
        self
    }

    pub fn merges_existing(&self) -> bool {
        self.incremental || self.retry_mode
    }

    pub fn layout(&self) -> &IndexLayout {
        &self.layout
    }

    pub fn video_map(&self) -> &VideoMap {
        &self.video_map
    }

    pub fn index(&self) -> &WordIndex {
        &self.index
    }

    /// Load existing shards and the video map into this run
    pub fn seed_from_disk(&mut self) -> std::result::Result<(), IndexerError> {
        info!("📂 Incremental mode: loading existing index from {}", self.layout.output_dir().display());

        let loaded = self.store.load_all()?;
        self.report.lemmas_loaded = loaded.lemmas.len();
        self.index.merge(loaded.index);
        self.whitelist.extend(loaded.lemmas);

        self.video_map = VideoMap::load(&self.layout.video_map_path());
        Ok(())
    }

    /// Transcribe, collect and merge one video
    pub async fn process_video(&mut self, position: usize, item: &MediaItem) -> VideoOutcome {
        let outcome = self.handle_video(position, item).await;
        self.report.record(&outcome);
        if let VideoOutcome::Failed(failure) = &outcome {
            self.failures.push(failure.clone());
        }
        outcome
    }

    pub async fn process_all(&mut self, items: &[MediaItem]) -> Vec<VideoOutcome> {
        let total = items.len();
        let mut outcomes = Vec::with_capacity(total);
        for (position, item) in items.iter().enumerate() {
            info!("📹 Processing [{}/{}] {} ({})", position + 1, total, item.title, item.video_id);
            outcomes.push(self.process_video(position, item).await);
        }
        outcomes
    }

    async fn handle_video(&mut self, position: usize, item: &MediaItem) -> VideoOutcome {
        if self.video_map.contains(&item.video_id) {
            let reason = if self.seen_this_run.contains(&item.video_id) {
                SkipReason::DuplicateInRun
            } else {
                SkipReason::AlreadyIndexed
            };
            info!("⏭️ Skipping {} ({:?})", item.video_id, reason);
            return VideoOutcome::Skipped {
                video_id: item.video_id.clone(),
                reason,
            };
        }

        let (words, cached_title, from_cache) = match self.load_words(item).await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("❌ Error processing {}: {}", item.filename, e);
                return VideoOutcome::Failed(FailedVideo {
                    filename: item.filename.clone(),
                    error: e.to_string(),
                    index: position,
                });
            }
        };

        let collected = self.collector.collect(&item.video_id, &words);
        let occurrences = collected.occurrences;
        self.index.merge(collected.index);

        let mut entry = item.to_video_entry();
        if let Some(title) = cached_title {
            entry.title = title;
        }
        self.video_map.insert(item.video_id.clone(), entry);
        self.seen_this_run.insert(item.video_id.clone());

        info!("✓ Indexed {} word occurrences from {}", occurrences, item.video_id);
        VideoOutcome::Indexed {
            video_id: item.video_id.clone(),
            occurrences,
            from_cache,
        }
    }

    /// Words from the cache when valid, otherwise from the transcriber
    async fn load_words(
        &self,
        item: &MediaItem,
    ) -> std::result::Result<(Vec<TranscriptWord>, Option<String>, bool), TranscriptionError> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.load(&item.path).await {
                return Ok((cached.words, cached.info.title, true));
            }
        }

        info!("🗣️ Transcribing {} with {}", item.filename, self.transcriber.backend_name());
        let words = self.transcriber.transcribe(&item.path).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save(&item.path, &words, Some(&item.title)).await {
                warn!("⚠️ Could not save transcription cache for {}: {}", item.filename, e);
            }
        }

        Ok((words, None, false))
    }

    fn log_top_words(&self) {
        if self.top_words_report == 0 || self.index.is_empty() {
            return;
        }

        info!("📋 Original words (before density filter):");
        info!("{:<20} {:<15} {}", "Word", "Occurrences", "First at");
        for (word, count, first) in self.index.most_frequent(self.top_words_report) {
            info!("{:<20} {:<15} {:.1}s", word, count, first);
        }
        if self.index.len() > self.top_words_report {
            info!("... and {} more words", self.index.len() - self.top_words_report);
        }
    }

    /// Score, filter, dedup and persist everything
    pub fn finish(mut self) -> std::result::Result<RunReport, IndexerError> {
        self.log_top_words();

        self.report.lemmas_collected = self.index.len();
        self.report.occurrences_collected = self.index.occurrence_count();

        let filter = self.filter.clone().with_whitelist(std::mem::take(&mut self.whitelist));
        info!(
            "🎯 Scoring {} words (min score {}, {} whitelisted)",
            self.report.lemmas_collected,
            filter.min_score(),
            filter.whitelist_len()
        );

        let scored = self.scorer.score_index(std::mem::take(&mut self.index));
        for lemma in scored.iter().filter(|l| filter.retains(l)).take(5) {
            debug!("{} -> {:?}", lemma.lemma, lemma.score);
        }
        let retained = filter.apply(scored);
        self.report.lemmas_retained = retained.len();
        self.report.occurrences_retained = retained.iter().map(|l| l.occurrences.len()).sum();

        let deduplicated: Vec<ScoredLemma> = retained
            .into_iter()
            .map(|mut lemma| {
                lemma.occurrences = self.deduplicator.deduplicate(lemma.occurrences);
                lemma
            })
            .collect();
        self.report.occurrences_persisted = deduplicated.iter().map(|l| l.occurrences.len()).sum();

        let written = self.store.write_all(deduplicated)?;
        self.report.shards_written = written.len();
        if !self.merges_existing() {
            self.store.remove_stale(&written)?;
        }

        std::fs::create_dir_all(self.layout.output_dir())?;
        self.video_map.save(&self.layout.video_map_path())?;
        self.report.total_videos = self.video_map.len();

        IndexMetadata::new(self.video_map.len(), self.report.occurrences_persisted, self.indexer_label.clone())
            .save(&self.layout.metadata_path())?;

        let update = FailureLog::new(self.layout.failure_log_path()).record(&self.failures, self.retry_mode)?;
        debug!("Failure log: {:?}", update);

        self.report.duration = self.started.elapsed();
        Ok(self.report)
    }
}

/// Acquisition, indexing and persistence for one configured run
pub struct Pipeline {
    config: Config,
    transcriber: Arc<dyn Transcriber>,
    downloader: Option<Box<dyn MediaDownloader>>,
}

impl Pipeline {
    pub fn new(config: Config, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            config,
            transcriber,
            downloader: None,
        }
    }

    pub fn with_downloader(mut self, downloader: Box<dyn MediaDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, retry_failed: bool) -> Result<RunReport> {
        let platform = self.config.output.platform;
        let layout = IndexLayout::new(&self.config.output.output_dir, platform);
        let media_dir = &self.config.acquisition.media_dir;

        let retry_filter = if retry_failed {
            let log = FailureLog::new(layout.failure_log_path());
            match log.failed_filenames().context("Failed to read failure log")? {
                Some(names) => Some(names),
                None => {
                    info!("No {} found, nothing to retry", log.path().display());
                    return Ok(RunReport::default());
                }
            }
        } else {
            None
        };

        let mut titles = HashMap::new();
        let mut download_failures = 0;
        if retry_failed {
            info!("🔁 Retry mode: skipping download phase");
        } else if self.config.acquisition.skip_download {
            info!("⏭️ Download skipped, using files in {}", media_dir.display());
        } else if let Some(downloader) = &self.downloader {
            for url in &self.config.acquisition.urls {
                let report = downloader.download(url, media_dir).await;
                download_failures += report.failures.len();
                for failure in &report.failures {
                    warn!("⚠️ Could not acquire {}: {}", failure.source, failure.reason);
                }
                titles.extend(report.videos.into_iter().map(|v| (v.id, v.title)));
            }
        }

        let mut items = self.discover(media_dir, platform)?;
        for item in &mut items {
            if let Some(title) = titles.get(&item.video_id) {
                item.title = title.clone();
            }
        }

        if let Some(names) = &retry_filter {
            items.retain(|item| names.contains(&item.filename));
            info!("🔁 Retry mode: {} previously failed videos", items.len());
            if items.is_empty() {
                info!("No failed videos to retry");
                return Ok(RunReport::default());
            }
        }

        let mut run = IndexingRun::new(&self.config, Arc::clone(&self.transcriber)).with_retry_mode(retry_failed);
        if run.merges_existing() {
            run.seed_from_disk().context("Failed to load existing index")?;
        }

        run.process_all(&items).await;

        let mut report = run.finish().context("Failed to write index")?;
        report.download_failures = download_failures;
        Ok(report)
    }

    fn discover(&self, media_dir: &Path, platform: Platform) -> Result<Vec<MediaItem>> {
        if !media_dir.exists() && self.config.acquisition.urls.is_empty() {
            warn!("Media directory {} does not exist, nothing to index", media_dir.display());
            return Ok(Vec::new());
        }

        let scanner = LocalMediaScanner::new(&self.config.acquisition.supported_extensions);
        scanner
            .scan(media_dir, platform)
            .with_context(|| format!("Failed to scan media directory {}", media_dir.display()))
    }
}
