// file: src/cache/persistence.rs
// description: on-disk store for computed breakdowns, one JSON file per fingerprint
// reference: write-then-rename keeps partially written entries invisible

use crate::error::{PipelineError, Result};
use crate::models::CacheEntry;
use crate::utils::validation::Validator;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const ENTRY_EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize)]
pub struct StoredEntry {
    pub fingerprint: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct DiskStore {
    directory: PathBuf,
}

impl DiskStore {
    pub async fn open(directory: PathBuf) -> Result<Self> {
        fs::create_dir_all(&directory).await.map_err(|e| {
            PipelineError::StorageUnavailable(format!(
                "Failed to create cache directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        debug!("Cache store ready at {}", directory.display());
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", fingerprint, ENTRY_EXTENSION))
    }

    pub async fn load(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        Validator::validate_fingerprint(fingerprint)?;
        let path = self.entry_path(fingerprint);

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PipelineError::StorageUnavailable(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let entry: CacheEntry = serde_json::from_str(&contents).map_err(|e| {
            PipelineError::StorageUnavailable(format!(
                "Corrupt cache entry {}: {}",
                path.display(),
                e
            ))
        })?;

        if entry.fingerprint != fingerprint {
            return Err(PipelineError::StorageUnavailable(format!(
                "Cache entry {} holds fingerprint {}",
                path.display(),
                entry.fingerprint
            )));
        }

        debug!("Loaded cache entry {}", fingerprint);
        Ok(Some(entry))
    }

    pub async fn save(&self, entry: &CacheEntry) -> Result<()> {
        Validator::validate_fingerprint(&entry.fingerprint)?;

        let contents = serde_json::to_vec(entry)?;
        let path = self.entry_path(&entry.fingerprint);
        let temp_path = self
            .directory
            .join(format!(".{}.{}.tmp", entry.fingerprint, ENTRY_EXTENSION));

        fs::write(&temp_path, contents).await.map_err(|e| {
            PipelineError::StorageUnavailable(format!(
                "Failed to write {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(PipelineError::StorageUnavailable(format!(
                "Failed to publish {}: {}",
                path.display(),
                e
            )));
        }

        debug!("Saved cache entry {}", entry.fingerprint);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<StoredEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.directory).await.map_err(|e| {
            PipelineError::StorageUnavailable(format!(
                "Failed to list {}: {}",
                self.directory.display(),
                e
            ))
        })?;

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }

            let Some(fingerprint) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            if Validator::validate_fingerprint(fingerprint).is_err() {
                continue;
            }

            let size_bytes = item.metadata().await.map(|m| m.len()).unwrap_or(0);
            entries.push(StoredEntry {
                fingerprint: fingerprint.to_string(),
                size_bytes,
            });
        }

        entries.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        Ok(entries)
    }

    pub async fn purge(&self) -> Result<usize> {
        let entries = self.list().await?;

        for entry in &entries {
            let path = self.entry_path(&entry.fingerprint);
            fs::remove_file(&path)
                .await
                .map_err(|e| PipelineError::file_operation(&path, e))?;
        }

        info!(
            "Purged {} cache entries from {}",
            entries.len(),
            self.directory.display()
        );
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BreakdownTotals, ProductionBreakdown};
    use tempfile::tempdir;

    fn entry(fingerprint: &str) -> CacheEntry {
        CacheEntry::new(
            fingerprint.to_string(),
            ProductionBreakdown {
                totals: BreakdownTotals {
                    scene_count: 0,
                    character_count: 0,
                    location_count: 0,
                    dialogue_line_count: 0,
                    page_eighths: 0,
                    estimated_runtime_secs: 0,
                },
                scenes: vec![],
                characters: vec![],
                locations: vec![],
                production_elements: vec![],
            },
        )
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path().join("cache")).await.unwrap();
        let fingerprint = "ab".repeat(32);

        store.save(&entry(&fingerprint)).await.unwrap();
        let loaded = store.load(&fingerprint).await.unwrap().unwrap();

        assert_eq!(loaded.fingerprint, fingerprint);
        assert_eq!(loaded.breakdown.totals.scene_count, 0);
        assert!(!dir.path().join("cache").join(format!(".{}.json.tmp", fingerprint)).exists());
    }

    #[tokio::test]
    async fn test_missing_entry_is_none() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path().to_path_buf()).await.unwrap();

        assert!(store.load(&"cd".repeat(32)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_storage_unavailable() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path().to_path_buf()).await.unwrap();
        let fingerprint = "ef".repeat(32);
        std::fs::write(dir.path().join(format!("{}.json", fingerprint)), "{not json").unwrap();

        let err = store.load(&fingerprint).await.unwrap_err();
        assert!(matches!(err, PipelineError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_list_and_purge() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path().to_path_buf()).await.unwrap();
        store.save(&entry(&"01".repeat(32))).await.unwrap();
        store.save(&entry(&"02".repeat(32))).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].fingerprint, "01".repeat(32));

        assert_eq!(store.purge().await.unwrap(), 2);
        assert!(store.list().await.unwrap().is_empty());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_fingerprint() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path().to_path_buf()).await.unwrap();

        assert!(store.load("../../etc/passwd").await.is_err());
    }
}
