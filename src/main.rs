use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use vocab_video_indexer::acquisition::downloader_for;
use vocab_video_indexer::{Config, Pipeline, Platform, WhisperCliTranscriber};

fn cli() -> Command {
    Command::new("Vocab Video Indexer")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Detects taught vocabulary in video transcripts and builds a timestamped word index")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: search standard locations)")
        )
        .arg(
            Arg::new("media-dir")
                .short('d')
                .long("media-dir")
                .value_name("DIR")
                .help("Directory holding downloaded or local media files")
        )
        .arg(
            Arg::new("urls")
                .short('u')
                .long("urls")
                .value_name("URL")
                .num_args(1..)
                .action(ArgAction::Append)
                .help("Video or playlist URLs (BV ids for bilibili) to download")
        )
        .arg(
            Arg::new("platform")
                .short('p')
                .long("platform")
                .value_name("PLATFORM")
                .value_parser(["bilibili", "youtube"])
                .help("Source platform; decides downloader, file naming and default min score")
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for shards, video map and metadata")
        )
        .arg(
            Arg::new("min-score")
                .short('s')
                .long("min-score")
                .value_name("SCORE")
                .value_parser(clap::value_parser!(u32))
                .help("Minimum score for a word to be kept (default: 3 bilibili, 15 youtube)")
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Whisper model name")
        )
        .arg(
            Arg::new("incremental")
                .long("incremental")
                .help("Merge into the existing index, skipping already indexed videos")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("retry-failed")
                .long("retry-failed")
                .help("Only reprocess videos listed in the failure log")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("skip-download")
                .long("skip-download")
                .help("Index media already in the media directory without downloading")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    // Initialize logging
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter("vocab_video_indexer=debug,vocab_indexer=debug,info")
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "vocab_video_indexer=info,vocab_indexer=info,warn".into()),
            )
            .with_target(false)
            .init();
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    // Command-line flags win over file and environment
    if let Some(dir) = matches.get_one::<String>("media-dir") {
        config.acquisition.media_dir = PathBuf::from(dir);
    }
    if let Some(urls) = matches.get_many::<String>("urls") {
        config.acquisition.urls = urls.cloned().collect();
    }
    if let Some(platform) = matches.get_one::<String>("platform") {
        config.output.platform = platform.parse::<Platform>().map_err(anyhow::Error::msg)?;
    }
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output.output_dir = PathBuf::from(dir);
    }
    if let Some(score) = matches.get_one::<u32>("min-score") {
        config.indexing.min_score = Some(*score);
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config.transcription.model = model.clone();
    }
    if matches.get_flag("incremental") {
        config.output.incremental = true;
    }
    if matches.get_flag("skip-download") {
        config.acquisition.skip_download = true;
    }
    let retry_failed = matches.get_flag("retry-failed");

    config.validate().context("Invalid configuration")?;

    info!("🚀 Vocab Video Indexer starting...");
    for line in config.summary().lines() {
        info!("{}", line);
    }

    if config.acquisition.urls.is_empty() && !config.acquisition.media_dir.exists() {
        error!("Media directory does not exist: {}", config.acquisition.media_dir.display());
        return Err(anyhow::anyhow!("Media directory not found and no URLs given"));
    }

    let transcriber = Arc::new(WhisperCliTranscriber::new(&config.transcription));
    let downloader = downloader_for(config.output.platform, &config.acquisition);
    let pipeline = Pipeline::new(config, transcriber).with_downloader(downloader);

    let report = pipeline.run(retry_failed).await?;
    report.log_summary();

    if report.failed > 0 {
        warn!("⚠️ {} videos failed; rerun with --retry-failed to try them again", report.failed);
    }
    info!("🎉 Indexing completed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let matches = cli()
            .try_get_matches_from([
                "vocab-indexer",
                "--platform",
                "youtube",
                "--urls",
                "https://youtu.be/aaaaaaaaaaa",
                "https://youtu.be/bbbbbbbbbbb",
                "--min-score",
                "12",
                "--incremental",
            ])
            .unwrap();

        assert_eq!(matches.get_one::<String>("platform").unwrap(), "youtube");
        assert_eq!(matches.get_many::<String>("urls").unwrap().count(), 2);
        assert_eq!(*matches.get_one::<u32>("min-score").unwrap(), 12);
        assert!(matches.get_flag("incremental"));
        assert!(!matches.get_flag("retry-failed"));
    }

    #[test]
    fn test_cli_rejects_unknown_platform() {
        assert!(cli().try_get_matches_from(["vocab-indexer", "--platform", "vimeo"]).is_err());
    }
}
