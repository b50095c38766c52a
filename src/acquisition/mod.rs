//! Getting media onto local disk and describing it for the indexer

pub mod downloader;
pub mod local;

pub use downloader::{downloader_for, MediaDownloader, RemoteVideo, YouGetDownloader, YtDlpDownloader};
pub use local::LocalMediaScanner;

use std::path::PathBuf;

use crate::storage::{Platform, VideoEntry};

/// A media file ready for transcription
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    /// Stable id used as the video map key and in every occurrence
    pub video_id: String,
    pub title: String,
    pub filename: String,
    pub path: PathBuf,
    /// Platform-native id when one is known
    pub bvid: Option<String>,
    pub page: Option<u32>,
    pub platform: Platform,
}

impl MediaItem {
    pub fn to_video_entry(&self) -> VideoEntry {
        VideoEntry {
            title: self.title.clone(),
            bvid: self.bvid.clone(),
            platform: match self.platform {
                Platform::Youtube => Some(Platform::Youtube),
                Platform::Bilibili => None,
            },
            page: self.page,
            filename: self.filename.clone(),
        }
    }
}

/// A source that could not be downloaded
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionFailure {
    /// URL or platform id that was requested
    pub source: String,
    pub reason: String,
}

/// Result of downloading one source
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Videos now on disk, with whatever metadata the tool reported
    pub videos: Vec<RemoteVideo>,
    pub failures: Vec<AcquisitionFailure>,
}
