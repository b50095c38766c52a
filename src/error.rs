//! Error types for index storage and the external collaborators

use std::path::PathBuf;

/// Result type for index storage operations
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Errors raised while reading or writing persisted index files
#[derive(thiserror::Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Errors raised by the transcription collaborator
#[derive(thiserror::Error, Debug)]
pub enum TranscriptionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio extraction failed for {0}")]
    AudioExtraction(String),

    #[error("{backend} exited with status {status}")]
    CommandFailed { backend: String, status: String },

    #[error("{backend} timed out after {seconds}s")]
    Timeout { backend: String, seconds: u64 },

    #[error("Unreadable transcription output: {0}")]
    Output(String),

    #[error("No transcript available for {0}")]
    Missing(String),
}

/// Errors raised by the acquisition collaborator
#[derive(thiserror::Error, Debug)]
pub enum AcquisitionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media directory does not exist: {0}")]
    MissingDirectory(String),

    #[error("Invalid source URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{tool} failed: {reason}")]
    Tool { tool: String, reason: String },
}
