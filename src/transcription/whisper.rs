use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{TranscriptWord, Transcriber};
use crate::config::TranscriptionConfig;
use crate::error::TranscriptionError;

/// Extensions that whisper can read directly without an ffmpeg pass
const DIRECT_AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "flac"];

/// Word entry in whisper's JSON output
#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    #[serde(default)]
    end: f64,
}

/// Segment entry in whisper's JSON output
#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

/// Runs ffmpeg and the python whisper CLI as subprocesses
#[derive(Debug, Clone)]
pub struct WhisperCliTranscriber {
    model: String,
    language: Option<String>,
    initial_prompt: Option<String>,
    timeout: Duration,
    /// Directory for intermediate audio and whisper output; a temp dir when `None`
    work_dir: Option<PathBuf>,
}

impl WhisperCliTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            model: config.model.clone(),
            language: config.language.clone(),
            initial_prompt: config.initial_prompt.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            work_dir: config.work_dir.clone(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Convert media to 16kHz mono WAV unless whisper can read it as is
    async fn prepare_audio(&self, media_path: &Path, work_dir: &Path) -> Result<PathBuf, TranscriptionError> {
        let is_audio = media_path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| DIRECT_AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        if is_audio {
            return Ok(media_path.to_path_buf());
        }

        let stem = media_path
            .file_stem()
            .ok_or_else(|| TranscriptionError::AudioExtraction(media_path.display().to_string()))?
            .to_string_lossy();
        let audio_path = work_dir.join(format!("{}.wav", stem));

        info!("🎵 Extracting audio: {}", media_path.display());
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-i")
            .arg(media_path)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1", "-f", "wav", "-y"])
            .arg(&audio_path);

        let output = run_with_timeout(cmd, "ffmpeg", self.timeout).await?;
        if !output.status.success() || !audio_path.exists() {
            return Err(TranscriptionError::AudioExtraction(media_path.display().to_string()));
        }

        Ok(audio_path)
    }

    /// Command-line arguments for one whisper invocation
    fn whisper_args(&self, audio_path: &Path, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![audio_path.into()];
        let mut flags: Vec<(&str, OsString)> = vec![
            ("--model", self.model.clone().into()),
            ("--output_dir", output_dir.into()),
            ("--output_format", "json".into()),
            ("--word_timestamps", "True".into()),
            ("--verbose", "False".into()),
            ("--fp16", "False".into()),
        ];
        if let Some(language) = &self.language {
            flags.push(("--language", language.clone().into()));
        }
        if let Some(prompt) = &self.initial_prompt {
            flags.push(("--initial_prompt", prompt.clone().into()));
        }

        for (flag, value) in flags {
            args.push(flag.into());
            args.push(value);
        }
        args
    }

    async fn run_whisper(&self, audio_path: &Path, output_dir: &Path) -> Result<PathBuf, TranscriptionError> {
        let mut cmd = Command::new("whisper");
        cmd.args(self.whisper_args(audio_path, output_dir));

        info!("🚀 Running whisper ({} model) on {}", self.model, audio_path.display());
        let output = run_with_timeout(cmd, "whisper", self.timeout).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("❌ whisper failed: {}", stderr.trim());
            return Err(TranscriptionError::CommandFailed {
                backend: "whisper".to_string(),
                status: output.status.to_string(),
            });
        }

        let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy();
        let json_path = output_dir.join(format!("{}.json", stem));
        if !json_path.exists() {
            return Err(TranscriptionError::Output(format!(
                "no JSON output found in {}",
                output_dir.display()
            )));
        }
        Ok(json_path)
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe(&self, media_path: &Path) -> Result<Vec<TranscriptWord>, TranscriptionError> {
        let start_time = Instant::now();

        // Scratch space lives until the end of this call
        let scratch = match &self.work_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                tempfile::Builder::new().prefix("whisper_").tempdir_in(dir)?
            }
            None => tempfile::Builder::new().prefix("whisper_").tempdir()?,
        };

        let audio_path = self.prepare_audio(media_path, scratch.path()).await?;
        let json_path = self.run_whisper(&audio_path, scratch.path()).await?;
        let content = tokio::fs::read_to_string(&json_path).await?;
        let words = parse_whisper_json(&content)?;

        info!(
            "✅ Transcribed {} in {:.1}s: {} words",
            media_path.display(),
            start_time.elapsed().as_secs_f64(),
            words.len()
        );
        Ok(words)
    }

    fn backend_name(&self) -> &str {
        "whisper"
    }
}

/// Run a command to completion, killing it when the deadline passes
async fn run_with_timeout(
    mut cmd: Command,
    backend: &str,
    timeout: Duration,
) -> Result<std::process::Output, TranscriptionError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("⚡ Executing {} (timeout {}s)", backend, timeout.as_secs());
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            error!("⏰ {} timed out after {}s", backend, timeout.as_secs());
            Err(TranscriptionError::Timeout {
                backend: backend.to_string(),
                seconds: timeout.as_secs(),
            })
        }
    }
}

/// Flatten whisper JSON into timed words.
///
/// Segments without word timings are split on whitespace and every word
/// gets the segment's start time.
pub fn parse_whisper_json(content: &str) -> Result<Vec<TranscriptWord>, TranscriptionError> {
    let output: WhisperOutput =
        serde_json::from_str(content).map_err(|e| TranscriptionError::Output(e.to_string()))?;

    let mut words = Vec::new();
    let mut fallback_segments = 0;

    for segment in output.segments {
        if segment.words.is_empty() {
            fallback_segments += 1;
            words.extend(
                segment
                    .text
                    .split_whitespace()
                    .map(|w| TranscriptWord::new(w, segment.start, segment.end)),
            );
        } else {
            words.extend(
                segment
                    .words
                    .into_iter()
                    .map(|w| TranscriptWord::new(w.word.trim(), w.start, w.end)),
            );
        }
    }

    if fallback_segments > 0 {
        warn!("{} segments had no word timings, using segment start times", fallback_segments);
    }
    Ok(words)
}
