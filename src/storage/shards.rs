use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::IndexLayout;
use crate::error::{IndexerError, Result};
use crate::index::{ScoredLemma, ScoredOccurrence, WordIndex};

/// Key used for lemmas that do not start with a letter
pub const OTHERS_SHARD: &str = "others";

/// Contents of one shard file
pub type ShardFile = BTreeMap<String, Vec<ScoredOccurrence>>;

/// Shard a lemma belongs to: its first letter, or `others`
pub fn shard_key(lemma: &str) -> String {
    match lemma.chars().next() {
        Some(c) if c.is_alphabetic() => c.to_lowercase().collect(),
        _ => OTHERS_SHARD.to_string(),
    }
}

fn is_shard_key(key: &str) -> bool {
    key == OTHERS_SHARD || (key.chars().count() == 1 && key.chars().all(char::is_alphabetic))
}

/// Everything recovered from existing shards
#[derive(Debug, Default)]
pub struct LoadedShards {
    /// Occurrences with their stored scores dropped
    pub index: WordIndex,
    /// Every lemma that was already persisted
    pub lemmas: BTreeSet<String>,
    pub files_read: usize,
    pub files_skipped: usize,
}

/// Reads and writes the alphabet-sharded index files
#[derive(Debug, Clone)]
pub struct ShardStore {
    layout: IndexLayout,
}

impl ShardStore {
    pub fn new(layout: IndexLayout) -> Self {
        Self { layout }
    }

    /// Shard files currently on disk, keyed by shard key
    pub fn existing_shards(&self) -> Result<BTreeMap<String, PathBuf>> {
        let mut found = BTreeMap::new();
        let dir = self.layout.output_dir();
        if !dir.exists() {
            return Ok(found);
        }

        let prefix = self.layout.shard_prefix();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let key = name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(".json"));
            if let Some(key) = key.filter(|k| is_shard_key(k)) {
                found.insert(key.to_string(), path.clone());
            }
        }
        Ok(found)
    }

    /// Load every existing shard. Unreadable shards count as empty.
    pub fn load_all(&self) -> Result<LoadedShards> {
        let mut loaded = LoadedShards::default();

        for (key, path) in self.existing_shards()? {
            let parsed = std::fs::read_to_string(&path)
                .map_err(IndexerError::from)
                .and_then(|content| {
                    serde_json::from_str::<ShardFile>(&content).map_err(|source| IndexerError::Json {
                        path: path.clone(),
                        source,
                    })
                });

            match parsed {
                Ok(shard) => {
                    debug!("Loaded shard '{}' with {} lemmas", key, shard.len());
                    for (lemma, occurrences) in shard {
                        loaded
                            .index
                            .extend_lemma(&lemma, occurrences.into_iter().map(ScoredOccurrence::into_raw));
                        loaded.lemmas.insert(lemma);
                    }
                    loaded.files_read += 1;
                }
                Err(e) => {
                    warn!("⚠️ Skipping unreadable shard {}: {}", path.display(), e);
                    loaded.files_skipped += 1;
                }
            }
        }

        info!(
            "📂 Loaded {} shards ({} skipped): {} lemmas, {} occurrences",
            loaded.files_read,
            loaded.files_skipped,
            loaded.lemmas.len(),
            loaded.index.occurrence_count()
        );
        Ok(loaded)
    }

    /// Group lemmas by shard key and overwrite each shard file
    pub fn write_all(&self, lemmas: Vec<ScoredLemma>) -> Result<Vec<PathBuf>> {
        let mut shards: BTreeMap<String, ShardFile> = BTreeMap::new();
        for lemma in lemmas {
            if lemma.occurrences.is_empty() {
                continue;
            }
            shards
                .entry(shard_key(&lemma.lemma))
                .or_default()
                .insert(lemma.lemma, lemma.occurrences);
        }

        if shards.is_empty() {
            info!("No lemmas survived filtering, no shards written");
            return Ok(Vec::new());
        }

        std::fs::create_dir_all(self.layout.output_dir())?;

        let mut written = Vec::with_capacity(shards.len());
        for (key, shard) in &shards {
            let path = self.layout.shard_path(key);
            self.write_atomic(&path, shard)?;
            debug!("Wrote shard {} ({} lemmas)", path.display(), shard.len());
            written.push(path);
        }

        info!("💾 Wrote {} shard files", written.len());
        Ok(written)
    }

    /// Delete shard files on disk that are not in `keep`
    pub fn remove_stale(&self, keep: &[PathBuf]) -> Result<usize> {
        let mut removed = 0;
        for (key, path) in self.existing_shards()? {
            if keep.contains(&path) {
                continue;
            }
            std::fs::remove_file(&path)?;
            debug!("Removed stale shard '{}' at {}", key, path.display());
            removed += 1;
        }
        if removed > 0 {
            info!("🗑️ Removed {} shard files left over from an earlier run", removed);
        }
        Ok(removed)
    }

    fn write_atomic(&self, path: &Path, shard: &ShardFile) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(self.layout.output_dir())?;
        serde_json::to_writer(&mut tmp, shard).map_err(|source| IndexerError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        tmp.flush()?;
        tmp.persist(path).map_err(|source| IndexerError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}
