use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{AcquisitionFailure, DownloadReport};
use crate::config::AcquisitionConfig;
use crate::error::AcquisitionError;
use crate::storage::Platform;

/// A video the downloader knows about
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteVideo {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Fetches media for one source URL into a directory
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, source: &str, media_dir: &Path) -> DownloadReport;

    fn tool_name(&self) -> &str;
}

/// Downloader matching the platform
pub fn downloader_for(platform: Platform, config: &AcquisitionConfig) -> Box<dyn MediaDownloader> {
    let policy = RetryPolicy::from_config(config);
    match platform {
        Platform::Youtube => Box::new(YtDlpDownloader::new(policy)),
        Platform::Bilibili => Box::new(YouGetDownloader::new(policy)),
    }
}

/// Attempt limits shared by every downloader
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AcquisitionConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: Duration::from_secs(config.retry_delay_secs),
            timeout: Duration::from_secs(config.download_timeout_secs),
        }
    }
}

async fn run_tool(mut cmd: Command, tool: &str, timeout: Duration) -> Result<std::process::Output, AcquisitionError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(AcquisitionError::Tool {
            tool: tool.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(AcquisitionError::Tool {
            tool: tool.to_string(),
            reason: format!("timed out after {}s", timeout.as_secs()),
        }),
    }
}

fn youtube_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid youtube id pattern"))
}

fn is_youtube_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Best-effort video id from a YouTube URL when metadata lookup fails
pub fn youtube_id_from_url(source: &str) -> Option<String> {
    if let Ok(url) = Url::parse(source) {
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
            if is_youtube_id(&v) {
                return Some(v.into_owned());
            }
        }

        let host = url.host_str().unwrap_or_default();
        let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
        let candidate = match (host, segments.as_slice()) {
            (h, [id, ..]) if h.ends_with("youtu.be") => Some(*id),
            (_, ["shorts", id, ..]) | (_, ["embed", id, ..]) | (_, ["live", id, ..]) => Some(*id),
            _ => None,
        };
        if let Some(id) = candidate.filter(|id| is_youtube_id(id)) {
            return Some(id.to_string());
        }
    }

    youtube_id_pattern()
        .captures(source)
        .map(|caps| caps[1].to_string())
}

/// One line of `yt-dlp --dump-json` output
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

/// Parse `--dump-json` output, one JSON object per line
pub fn parse_dump_json(stdout: &str) -> Vec<RemoteVideo> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<YtDlpInfo>(line).ok())
        .filter_map(|info| {
            let id = info.id.filter(|id| !id.is_empty())?;
            let url = info
                .url
                .or(info.webpage_url)
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));
            Some(RemoteVideo {
                title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
                id,
                url,
            })
        })
        .collect()
}

/// YouTube audio via yt-dlp, one WAV per video id
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    policy: RetryPolicy,
}

impl YtDlpDownloader {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Expand a video or playlist URL into individual videos
    async fn list_videos(&self, source: &str) -> Result<Vec<RemoteVideo>, AcquisitionError> {
        let mut cmd = Command::new("yt-dlp");
        cmd.args(["--dump-json", "--flat-playlist", source]);

        let output = run_tool(cmd, "yt-dlp", self.policy.timeout).await?;
        if !output.status.success() {
            return Err(AcquisitionError::Tool {
                tool: "yt-dlp".to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_dump_json(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn fetch_audio(&self, video: &RemoteVideo, media_dir: &Path) -> Result<(), AcquisitionError> {
        let template = media_dir.join(format!("{}.%(ext)s", video.id));
        let expected = media_dir.join(format!("{}.wav", video.id));
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                info!("🔄 Retry attempt {}/{} for {}", attempt, self.policy.max_attempts, video.id);
                tokio::time::sleep(self.policy.delay).await;
            }

            let mut cmd = Command::new("yt-dlp");
            cmd.args(["-f", "ba", "-x", "--audio-format", "wav", "--audio-quality", "0", "--no-playlist", "-o"])
                .arg(&template)
                .arg(format!("https://www.youtube.com/watch?v={}", video.id));

            let outcome = match run_tool(cmd, "yt-dlp", self.policy.timeout).await {
                Ok(output) if output.status.success() && expected.exists() => Ok(()),
                Ok(output) if output.status.success() => Err(AcquisitionError::Tool {
                    tool: "yt-dlp".to_string(),
                    reason: "output file not found".to_string(),
                }),
                Ok(output) => Err(AcquisitionError::Tool {
                    tool: "yt-dlp".to_string(),
                    reason: format!("exited with {}", output.status),
                }),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("⚠️ Download of {} failed: {}", video.id, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AcquisitionError::Tool {
            tool: "yt-dlp".to_string(),
            reason: "no download attempts made".to_string(),
        }))
    }
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn download(&self, source: &str, media_dir: &Path) -> DownloadReport {
        let mut report = DownloadReport::default();
        info!("📥 Downloading {}", source);

        if let Err(e) = tokio::fs::create_dir_all(media_dir).await {
            report.failures.push(AcquisitionFailure {
                source: source.to_string(),
                reason: e.to_string(),
            });
            return report;
        }

        let videos = match self.list_videos(source).await {
            Ok(videos) if !videos.is_empty() => videos,
            result => {
                if let Err(e) = result {
                    warn!("⚠️ Could not get video info for {}: {}", source, e);
                }
                match youtube_id_from_url(source) {
                    Some(id) => vec![RemoteVideo {
                        id,
                        title: "Unknown Title".to_string(),
                        url: source.to_string(),
                    }],
                    None => {
                        report.failures.push(AcquisitionFailure {
                            source: source.to_string(),
                            reason: "no video id found".to_string(),
                        });
                        return report;
                    }
                }
            }
        };
        info!("📺 Found {} video(s)", videos.len());

        for video in videos {
            if media_dir.join(format!("{}.wav", video.id)).exists() {
                debug!("Already downloaded: {}", video.id);
                report.videos.push(video);
                continue;
            }

            match self.fetch_audio(&video, media_dir).await {
                Ok(()) => {
                    info!("✅ Download complete: {} ({})", video.title, video.id);
                    report.videos.push(video);
                }
                Err(e) => {
                    error!("❌ Failed to download {}: {}", video.id, e);
                    report.failures.push(AcquisitionFailure {
                        source: video.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    fn tool_name(&self) -> &str {
        "yt-dlp"
    }
}

/// Bilibili videos via you-get in playlist mode; files keep you-get's naming
#[derive(Debug, Clone)]
pub struct YouGetDownloader {
    policy: RetryPolicy,
}

impl YouGetDownloader {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Accept either a full URL or a bare BV id
    pub fn video_url(source: &str) -> Result<Url, AcquisitionError> {
        let raw = if source.starts_with("BV") {
            format!("https://www.bilibili.com/video/{}", source)
        } else {
            source.to_string()
        };
        Url::parse(&raw).map_err(|e| AcquisitionError::InvalidUrl {
            url: source.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MediaDownloader for YouGetDownloader {
    async fn download(&self, source: &str, media_dir: &Path) -> DownloadReport {
        let mut report = DownloadReport::default();

        let url = match Self::video_url(source) {
            Ok(url) => url,
            Err(e) => {
                report.failures.push(AcquisitionFailure {
                    source: source.to_string(),
                    reason: e.to_string(),
                });
                return report;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(media_dir).await {
            report.failures.push(AcquisitionFailure {
                source: source.to_string(),
                reason: e.to_string(),
            });
            return report;
        }

        info!("📥 Downloading {} to {}", url, media_dir.display());
        let mut last_reason = String::new();

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                info!("🔄 Retry attempt {}/{} for {}", attempt, self.policy.max_attempts, source);
                tokio::time::sleep(self.policy.delay).await;
            }

            let mut cmd = Command::new("you-get");
            cmd.arg("--playlist").arg("-o").arg(media_dir).arg(url.as_str());

            match run_tool(cmd, "you-get", self.policy.timeout).await {
                // you-get exits non-zero when every file already exists
                Ok(output) if output.status.success() || String::from_utf8_lossy(&output.stdout).contains("Skip") => {
                    info!("✅ Download complete: {}", source);
                    return report;
                }
                Ok(output) => {
                    last_reason = format!("exited with {}", output.status);
                    warn!("⚠️ you-get {} for {}", last_reason, source);
                }
                Err(e) => {
                    last_reason = e.to_string();
                    warn!("⚠️ {}", last_reason);
                }
            }
        }

        error!("❌ Failed to download {}", source);
        report.failures.push(AcquisitionFailure {
            source: source.to_string(),
            reason: last_reason,
        });
        report
    }

    fn tool_name(&self) -> &str {
        "you-get"
    }
}
