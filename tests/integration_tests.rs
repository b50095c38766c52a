use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;

use vocab_video_indexer::storage::FailedVideo;
use vocab_video_indexer::{Config, ConfigBuilder, Pipeline, Platform, StaticTranscriber, TranscriptWord};

struct Workspace {
    _temp_dir: TempDir,
    media_dir: PathBuf,
    output_dir: PathBuf,
}

impl Workspace {
    async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let media_dir = temp_dir.path().join("media");
        let output_dir = temp_dir.path().join("data");
        fs::create_dir_all(&media_dir).await.unwrap();
        Self {
            _temp_dir: temp_dir,
            media_dir,
            output_dir,
        }
    }

    /// Create an (empty) media file and return its path
    async fn add_media(&self, filename: &str) -> PathBuf {
        let path = self.media_dir.join(filename);
        fs::write(&path, b"mock audio").await.unwrap();
        path
    }

    fn config(&self, platform: Platform, min_score: u32) -> Config {
        ConfigBuilder::new()
            .with_media_dir(&self.media_dir)
            .with_output_dir(&self.output_dir)
            .with_platform(platform)
            .with_min_score(min_score)
            .skip_download(true)
            .enable_caching(false)
            .build()
    }

    async fn read_json(&self, filename: &str) -> serde_json::Value {
        let content = fs::read_to_string(self.output_dir.join(filename)).await.unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

fn repeated(word: &str, times: &[f64]) -> Vec<TranscriptWord> {
    times.iter().map(|t| TranscriptWord::new(word, *t, *t + 0.3)).collect()
}

fn persisted_times(shard: &serde_json::Value, lemma: &str) -> Vec<f64> {
    shard[lemma]
        .as_array()
        .unwrap()
        .iter()
        .map(|occ| occ["t"].as_f64().unwrap())
        .collect()
}

async fn run(config: Config, transcriber: StaticTranscriber, retry: bool) -> vocab_video_indexer::RunReport {
    Pipeline::new(config, Arc::new(transcriber)).run(retry).await.unwrap()
}

#[tokio::test]
async fn test_apple_end_to_end() {
    let ws = Workspace::new().await;
    let media = ws.add_media("vid00000001.wav").await;

    let mut words = repeated("apple", &[10.0, 15.0, 20.0, 130.0, 131.0]);
    words.push(TranscriptWord::new("the", 200.0, 200.2));
    let transcriber = StaticTranscriber::new().with_transcript(media, words);

    let report = run(ws.config(Platform::Youtube, 10), transcriber, false).await;
    assert_eq!(report.indexed, 1);
    assert_eq!(report.lemmas_retained, 1);
    assert_eq!(report.occurrences_persisted, 2);

    let shard = ws.read_json("index_youtube_a.json").await;
    assert_eq!(persisted_times(&shard, "apple"), vec![10.0, 130.0]);
    assert_eq!(shard["apple"][0]["v"], "vid00000001");
    // every occurrence sits in a dense window
    assert_eq!(shard["apple"][0]["s"], 3);

    let video_map = ws.read_json("video_map_youtube.json").await;
    assert_eq!(video_map["vid00000001"]["platform"], "youtube");
    assert_eq!(video_map["vid00000001"]["page"], 1);

    let metadata = ws.read_json("metadata_youtube.json").await;
    assert_eq!(metadata["total_videos"], 1);
    assert_eq!(metadata["total_words"], 2);
    assert_eq!(metadata["sharding_type"], "alphabet");
}

#[tokio::test]
async fn test_lemma_below_threshold_is_not_persisted() {
    let ws = Workspace::new().await;
    let media = ws.add_media("vid00000001.wav").await;

    // apple scores 13, banana scores 2
    let mut words = repeated("apple", &[10.0, 15.0, 20.0, 130.0, 131.0]);
    words.extend(repeated("banana", &[300.0, 900.0]));
    let transcriber = StaticTranscriber::new().with_transcript(media, words);

    let report = run(ws.config(Platform::Youtube, 13), transcriber, false).await;
    assert_eq!(report.lemmas_collected, 2);
    assert_eq!(report.lemmas_retained, 1);
    assert!(ws.output_dir.join("index_youtube_a.json").exists());
    assert!(!ws.output_dir.join("index_youtube_b.json").exists());
}

#[tokio::test]
async fn test_incremental_run_skips_known_videos() {
    let ws = Workspace::new().await;
    let first = ws.add_media("vid00000001.wav").await;

    let transcriber = StaticTranscriber::new().with_transcript(first.clone(), repeated("apple", &[10.0]));
    run(ws.config(Platform::Youtube, 1), transcriber, false).await;

    let second = ws.add_media("vid00000002.wav").await;
    // No transcript for the first video: reprocessing it would fail
    let transcriber = StaticTranscriber::new().with_transcript(second, repeated("apple", &[500.0]));
    let mut config = ws.config(Platform::Youtube, 1);
    config.output.incremental = true;

    let report = run(config, transcriber, false).await;
    assert_eq!(report.skipped, 1);
    assert_eq!(report.indexed, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.total_videos, 2);

    let shard = ws.read_json("index_youtube_a.json").await;
    assert_eq!(persisted_times(&shard, "apple"), vec![10.0, 500.0]);
}

#[tokio::test]
async fn test_whitelist_always_wins_across_runs() {
    let ws = Workspace::new().await;
    let first = ws.add_media("vid00000001.wav").await;

    let transcriber = StaticTranscriber::new().with_transcript(first, repeated("banana", &[42.0]));
    run(ws.config(Platform::Youtube, 1), transcriber, false).await;

    let second = ws.add_media("vid00000002.wav").await;
    let transcriber = StaticTranscriber::new().with_transcript(second, repeated("cherry", &[1.0, 2.0, 3.0]));
    let mut config = ws.config(Platform::Youtube, 100);
    config.output.incremental = true;

    let report = run(config, transcriber, false).await;
    assert_eq!(report.lemmas_loaded, 1);
    assert_eq!(report.lemmas_retained, 1);

    let shard = ws.read_json("index_youtube_b.json").await;
    assert_eq!(persisted_times(&shard, "banana"), vec![42.0]);
    assert!(!ws.output_dir.join("index_youtube_c.json").exists());
}

#[tokio::test]
async fn test_fresh_runs_are_idempotent() {
    let ws = Workspace::new().await;
    let a = ws.add_media("vid00000001.wav").await;
    let b = ws.add_media("vid00000002.wav").await;

    let transcriber = || {
        StaticTranscriber::new()
            .with_transcript(a.clone(), repeated("apple", &[10.0, 15.0, 20.0, 130.0]))
            .with_transcript(b.clone(), repeated("apple", &[15.0, 70.0, 400.0]))
    };

    run(ws.config(Platform::Youtube, 3), transcriber(), false).await;
    let first = fs::read_to_string(ws.output_dir.join("index_youtube_a.json")).await.unwrap();

    run(ws.config(Platform::Youtube, 3), transcriber(), false).await;
    let second = fs::read_to_string(ws.output_dir.join("index_youtube_a.json")).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_corrupt_shard_is_treated_as_empty() {
    let ws = Workspace::new().await;
    let first = ws.add_media("vid00000001.wav").await;
    let transcriber = StaticTranscriber::new()
        .with_transcript(first, [repeated("apple", &[1.0]), repeated("banana", &[2.0])].concat());
    run(ws.config(Platform::Youtube, 1), transcriber, false).await;

    fs::write(ws.output_dir.join("index_youtube_b.json"), "{truncated").await.unwrap();

    let second = ws.add_media("vid00000002.wav").await;
    let transcriber = StaticTranscriber::new().with_transcript(second, repeated("cherry", &[5.0]));
    let mut config = ws.config(Platform::Youtube, 1);
    config.output.incremental = true;

    let report = run(config, transcriber, false).await;
    assert_eq!(report.lemmas_loaded, 1);

    let apple = ws.read_json("index_youtube_a.json").await;
    assert_eq!(persisted_times(&apple, "apple"), vec![1.0]);
    let cherry = ws.read_json("index_youtube_c.json").await;
    assert_eq!(persisted_times(&cherry, "cherry"), vec![5.0]);
}

#[tokio::test]
async fn test_empty_input_writes_no_shards() {
    let ws = Workspace::new().await;
    let media = ws.add_media("vid00000001.wav").await;
    // Only stop words and non-letters
    let words = vec![
        TranscriptWord::new("the", 0.0, 0.1),
        TranscriptWord::new("um", 1.0, 1.1),
        TranscriptWord::new("42", 2.0, 2.1),
    ];
    let transcriber = StaticTranscriber::new().with_transcript(media, words);

    let report = run(ws.config(Platform::Youtube, 1), transcriber, false).await;
    assert_eq!(report.indexed, 1);
    assert_eq!(report.shards_written, 0);

    let mut entries = fs::read_dir(&ws.output_dir).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        let name = entry.file_name().to_string_lossy().into_owned();
        assert!(!name.starts_with("index_"), "unexpected shard {}", name);
    }
}

#[tokio::test]
async fn test_failed_videos_are_retried() {
    let ws = Workspace::new().await;
    let good = ws.add_media("vid00000001.wav").await;
    let flaky = ws.add_media("vid00000002.wav").await;

    let transcriber = StaticTranscriber::new().with_transcript(good.clone(), repeated("apple", &[1.0]));
    let report = run(ws.config(Platform::Youtube, 1), transcriber, false).await;
    assert_eq!(report.failed, 1);

    let log_path = ws.output_dir.join("failed_videos_youtube.json");
    let failures: Vec<FailedVideo> =
        serde_json::from_str(&fs::read_to_string(&log_path).await.unwrap()).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].filename, "vid00000002.wav");
    assert_eq!(failures[0].index, 1);

    // Retry only touches the failed file and merges with what is already indexed
    let transcriber = StaticTranscriber::new().with_transcript(flaky, repeated("avocado", &[7.0]));
    let report = run(ws.config(Platform::Youtube, 1), transcriber, true).await;
    assert_eq!(report.videos_seen, 1);
    assert_eq!(report.indexed, 1);
    assert!(!log_path.exists());

    let shard = ws.read_json("index_youtube_a.json").await;
    assert_eq!(persisted_times(&shard, "apple"), vec![1.0]);
    assert_eq!(persisted_times(&shard, "avocado"), vec![7.0]);
}

#[tokio::test]
async fn test_bilibili_layout_and_default_threshold() {
    let ws = Workspace::new().await;
    let media = ws.add_media("English Words BV1XksdztEvb (P3. Fruit).mp4").await;
    let mut words = repeated("grape", &[1.0, 400.0, 900.0]);
    words.extend(repeated("melon", &[5.0, 600.0]));
    let transcriber = StaticTranscriber::new().with_transcript(media, words);

    let mut config = ws.config(Platform::Bilibili, 0);
    config.indexing.min_score = None;
    run(config, transcriber, false).await;

    let shard = ws.read_json("index_g.json").await;
    assert_eq!(persisted_times(&shard, "grape").len(), 3);
    assert!(!ws.output_dir.join("index_m.json").exists());

    let video_map = ws.read_json("video_map.json").await;
    let entry = &video_map["BV1XksdztEvb_p3"];
    assert_eq!(entry["bvid"], "BV1XksdztEvb");
    assert_eq!(entry["page"], 3);
    assert!(ws.output_dir.join("metadata.json").exists());
}

#[tokio::test]
async fn test_cached_transcription_is_reused() {
    let ws = Workspace::new().await;
    let media = ws.add_media("vid00000001.wav").await;

    let mut config = ws.config(Platform::Youtube, 1);
    config.cache.enabled = true;
    let transcriber = StaticTranscriber::new().with_transcript(media.clone(), repeated("apple", &[3.0]));
    run(config.clone(), transcriber, false).await;
    assert!(cache_file(&media).exists());

    // Second fresh run has no transcripts at all and must rely on the cache
    let report = run(config, StaticTranscriber::new(), false).await;
    assert_eq!(report.cache_hits, 1);
    assert_eq!(report.failed, 0);
}

fn cache_file(media: &Path) -> PathBuf {
    let mut name = media.as_os_str().to_os_string();
    name.push(".transcription.json");
    PathBuf::from(name)
}

#[tokio::test]
async fn test_fresh_run_removes_shards_from_earlier_runs() {
    let ws = Workspace::new().await;
    let old = ws.add_media("vid00000001.wav").await;
    let transcriber = StaticTranscriber::new().with_transcript(old.clone(), repeated("banana", &[4.0]));
    run(ws.config(Platform::Youtube, 1), transcriber, false).await;
    assert!(ws.output_dir.join("index_youtube_b.json").exists());

    // Start over with a different video set
    fs::remove_file(&old).await.unwrap();
    let new = ws.add_media("vid00000002.wav").await;
    let transcriber = StaticTranscriber::new().with_transcript(new, repeated("apple", &[8.0]));
    run(ws.config(Platform::Youtube, 1), transcriber, false).await;

    assert!(!ws.output_dir.join("index_youtube_b.json").exists());
    let video_map = ws.read_json("video_map_youtube.json").await;
    assert!(video_map.get("vid00000001").is_none());

    // A later incremental run must not bring the orphaned lemma back
    let newest = ws.add_media("vid00000003.wav").await;
    let transcriber = StaticTranscriber::new().with_transcript(newest, repeated("cherry", &[9.0]));
    let mut config = ws.config(Platform::Youtube, 100);
    config.output.incremental = true;
    let report = run(config, transcriber, false).await;

    assert_eq!(report.lemmas_loaded, 1);
    assert!(!ws.output_dir.join("index_youtube_b.json").exists());
    let shard = ws.read_json("index_youtube_a.json").await;
    assert_eq!(persisted_times(&shard, "apple"), vec![8.0]);
}
