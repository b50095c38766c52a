use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{IndexerError, Result};

/// A video that could not be acquired, transcribed or indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedVideo {
    pub filename: String,
    pub error: String,
    /// Position in the run's input order
    pub index: usize,
}

/// What happened to the failure log at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureLogUpdate {
    Written(usize),
    Removed,
    Unchanged,
}

/// `failed_videos.json` handling, including retry mode
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Previously failed videos, `None` when there is no log to retry
    pub fn load(&self) -> Result<Option<Vec<FailedVideo>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let failures = serde_json::from_str(&content).map_err(|source| IndexerError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(failures))
    }

    /// Filenames to retry
    pub fn failed_filenames(&self) -> Result<Option<HashSet<String>>> {
        Ok(self
            .load()?
            .map(|failures| failures.into_iter().map(|f| f.filename).collect()))
    }

    /// Persist this run's failures.
    ///
    /// A normal run writes the log only when something failed. A retry run
    /// rewrites it with the videos that are still failing, or removes it
    /// once every retry succeeded.
    pub fn record(&self, failures: &[FailedVideo], retry_mode: bool) -> Result<FailureLogUpdate> {
        if failures.is_empty() {
            if retry_mode && self.path.exists() {
                std::fs::remove_file(&self.path)?;
                info!("✅ All retries succeeded, removed {}", self.path.display());
                return Ok(FailureLogUpdate::Removed);
            }
            return Ok(FailureLogUpdate::Unchanged);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(failures).map_err(|source| IndexerError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, content)?;

        if retry_mode {
            warn!("⚠️ Updated {} ({} still failing)", self.path.display(), failures.len());
        } else {
            warn!("⚠️ Saved {} ({} failures)", self.path.display(), failures.len());
        }
        Ok(FailureLogUpdate::Written(failures.len()))
    }
}
