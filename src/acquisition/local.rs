use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::MediaItem;
use crate::error::AcquisitionError;
use crate::storage::Platform;

fn bvid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(BV[a-zA-Z0-9]+)").expect("valid BV id pattern"))
}

fn page_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(P(\d+)\.").expect("valid page pattern"))
}

/// BV id embedded in a bilibili download's filename
pub fn extract_bvid(filename: &str) -> Option<String> {
    bvid_pattern()
        .captures(filename)
        .map(|caps| caps[1].to_string())
}

/// Part number from names like `Title (P10. Part name).mp4`
pub fn extract_page_number(filename: &str) -> Option<u32> {
    page_pattern()
        .captures(filename)
        .and_then(|caps| caps[1].parse().ok())
}

/// Finds media files in one directory and derives stable ids from their names
#[derive(Debug, Clone)]
pub struct LocalMediaScanner {
    extensions: HashSet<String>,
}

impl LocalMediaScanner {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| self.extensions.contains(&e.to_lowercase()))
    }

    /// Media files directly inside `dir`, sorted by filename so parts stay in order
    pub fn scan(&self, dir: &Path, platform: Platform) -> Result<Vec<MediaItem>, AcquisitionError> {
        if !dir.is_dir() {
            return Err(AcquisitionError::MissingDirectory(dir.display().to_string()));
        }

        let mut items = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| AcquisitionError::Io(e.into()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !self.is_media(path) {
                continue;
            }
            items.push(Self::describe(path, platform));
        }

        info!("🔍 Found {} media files in {}", items.len(), dir.display());
        Ok(items)
    }

    /// Build a media item from a path alone
    pub fn describe(path: &Path, platform: Platform) -> MediaItem {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let item = match platform {
            Platform::Bilibili => {
                let bvid = extract_bvid(&filename);
                let page = extract_page_number(&filename);
                let video_id = match (&bvid, page) {
                    (Some(bvid), Some(page)) => format!("{}_p{}", bvid, page),
                    (Some(bvid), None) => bvid.clone(),
                    (None, _) => stem.clone(),
                };
                MediaItem {
                    video_id,
                    title: stem,
                    filename,
                    path: path.to_path_buf(),
                    bvid,
                    page,
                    platform,
                }
            }
            // yt-dlp output is named after the video id
            Platform::Youtube => MediaItem {
                video_id: stem.clone(),
                title: stem.clone(),
                filename,
                path: path.to_path_buf(),
                bvid: Some(stem),
                page: Some(1),
                platform,
            },
        };

        debug!("Media {} -> id {}", item.filename, item.video_id);
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scanner() -> LocalMediaScanner {
        LocalMediaScanner::new(&["mp4".to_string(), ".FLV".to_string(), "wav".to_string()])
    }

    #[test]
    fn test_filename_patterns() {
        assert_eq!(extract_bvid("Lesson BV1XksdztEvb (P3. Fruit).mp4").as_deref(), Some("BV1XksdztEvb"));
        assert_eq!(extract_bvid("plain.mp4"), None);
        assert_eq!(extract_page_number("(P10. [10]--10).mp4"), Some(10));
        assert_eq!(extract_page_number("P10 without marker.mp4"), None);
    }

    #[test]
    fn test_scan_is_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.mp4", "a.FLV", "notes.txt", "c.wav", "c.wav.transcription.json"] {
            std::fs::write(temp_dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(temp_dir.path().join("nested.mp4")).unwrap();

        let items = scanner().scan(temp_dir.path(), Platform::Bilibili).unwrap();
        let names: Vec<_> = items.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["a.FLV", "b.mp4", "c.wav"]);
    }

    #[test]
    fn test_bilibili_ids_include_page() {
        let item = LocalMediaScanner::describe(
            Path::new("/m/English BV1XksdztEvb (P2. Colors).mp4"),
            Platform::Bilibili,
        );
        assert_eq!(item.video_id, "BV1XksdztEvb_p2");
        assert_eq!(item.bvid.as_deref(), Some("BV1XksdztEvb"));
        assert_eq!(item.page, Some(2));
        assert_eq!(item.title, "English BV1XksdztEvb (P2. Colors)");

        let plain = LocalMediaScanner::describe(Path::new("/m/lesson one.mp4"), Platform::Bilibili);
        assert_eq!(plain.video_id, "lesson one");
        assert_eq!(plain.bvid, None);
    }

    #[test]
    fn test_youtube_ids_come_from_stem() {
        let item = LocalMediaScanner::describe(Path::new("/m/dQw4w9WgXcQ.wav"), Platform::Youtube);
        assert_eq!(item.video_id, "dQw4w9WgXcQ");
        assert_eq!(item.page, Some(1));
    }

    #[test]
    fn test_missing_directory() {
        let result = scanner().scan(Path::new("/definitely/not/here"), Platform::Youtube);
        assert!(matches!(result, Err(AcquisitionError::MissingDirectory(_))));
    }
}
