use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use vocab_video_indexer::transcription::cache::{TranscriptionCache, CACHE_VERSION};

#[derive(Parser)]
#[command(name = "cache-manager")]
#[command(about = "Transcription cache management utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory to inspect: the central cache dir, or the media dir when caches sit next to media
    #[arg(long, default_value = "temp_video")]
    dir: PathBuf,

    /// Central cache directory used when the indexer was configured with one
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Cache version considered current
    #[arg(long, default_value = CACHE_VERSION)]
    cache_version: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List all cached transcriptions
    List,
    /// Get cache statistics
    Stats,
    /// Invalidate the cache for one media file
    Invalidate {
        /// Media file whose transcription should be redone
        media_path: PathBuf,
    },
    /// Remove stale and unreadable cache files
    Prune,
    /// Clear all cache entries
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let cli = Cli::parse();

    let scan_dir = cli.cache_dir.clone().unwrap_or_else(|| cli.dir.clone());
    let cache = TranscriptionCache::new(cli.cache_dir, cli.cache_version);

    match cli.command {
        Commands::List => {
            let entries = cache.list_entries(&scan_dir).await?;

            if entries.is_empty() {
                info!("📭 No cached transcriptions found in {}", scan_dir.display());
                return Ok(());
            }

            info!("📚 Found {} cached transcriptions:", entries.len());

            for entry in entries {
                let status = match (&entry.version, entry.is_current) {
                    (_, true) => "✅ Current".to_string(),
                    (Some(version), false) => format!("⏰ Stale (v{})", version),
                    (None, _) => "❌ Unreadable".to_string(),
                };
                info!(
                    "  {} - {} words, {}",
                    entry.path.display(),
                    entry.word_count,
                    status
                );
                if let Some(title) = entry.title {
                    info!("    Title: {}", title);
                }
            }
        }

        Commands::Stats => {
            let stats = cache.stats(&scan_dir).await?;
            info!("📊 Cache Statistics (v{}):", cache.version());
            info!("  Total files: {}", stats.total_files);
            info!("  Current files: {}", stats.current_files);
            info!("  Stale files: {}", stats.stale_files);
            info!("  Unreadable files: {}", stats.corrupt_files);
            info!("  Total cached words: {}", stats.total_words);
        }

        Commands::Invalidate { media_path } => {
            let removed = cache.invalidate(&media_path).await?;
            if removed {
                info!("✅ Successfully invalidated cache for: {}", media_path.display());
            } else {
                warn!("⚠️ No cache found for: {}", media_path.display());
            }
        }

        Commands::Prune => {
            let count = cache.prune(&scan_dir).await?;
            info!("🗑️ Removed {} stale cache files", count);
        }

        Commands::Clear => {
            let count = cache.clear(&scan_dir).await?;
            info!("🧹 Cleared {} cache files", count);
        }
    }

    Ok(())
}
