//! MetadataStore — durable keyed storage for metadata records with full-scan
//! listing, backed by a flat directory of JSON files (`<root>/<key>.json`).
//! No cache and no locking: every operation re-reads the filesystem, and
//! concurrent writes to the same key resolve to whichever rename lands last.

use crate::models::record::MetadataRecord;
use crate::services::filename::ValidatedFilename;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("metadata for `{0}` not found")]
    RecordNotFound(String),
    #[error("record `{path}` holds invalid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("encoding record `{key}`: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Flat-file record store. The directory layout is an implementation choice;
/// callers only see the put/get/list surface.
#[derive(Clone, Debug)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write, so a read-only deployment never touches the disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Serialize `record` as pretty-printed JSON and move it into place.
    ///
    /// Writes go through a `.tmp-*` sibling with an fsync before the rename,
    /// so a crash mid-write never leaves a half-written record. An existing
    /// record under the same key is overwritten unconditionally.
    pub async fn put(&self, key: &ValidatedFilename, record: &MetadataRecord) -> StoreResult<()> {
        fs::create_dir_all(&self.root).await?;

        let body =
            serde_json::to_string_pretty(record).map_err(|source| StoreError::Encode {
                key: key.as_str().to_string(),
                source,
            })?;

        let final_path = self.record_path(key.as_str());
        let tmp_path = self.root.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        if let Err(err) = file.write_all(body.as_bytes()).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&final_path).await?;
                fs::rename(&tmp_path, &final_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        debug!("wrote metadata record {}", final_path.display());
        Ok(())
    }

    /// Read one record by key. The key is not pattern-checked here; a name
    /// that never passed upload validation simply has no file and 404s.
    pub async fn get(&self, key: &str) -> StoreResult<MetadataRecord> {
        let path = self.record_path(key);
        let raw = fs::read_to_string(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::RecordNotFound(key.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;

        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt { path, source })
    }

    /// Enumerate every `*.json` file directly under the root, one directory
    /// snapshot per call. A file that fails to parse yields an `Err` entry
    /// without aborting the rest of the scan. A missing root is an empty
    /// store, not an error.
    pub async fn list_all(&self) -> StoreResult<Vec<(String, StoreResult<MetadataRecord>)>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let parsed = match fs::read_to_string(&path).await {
                Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                }),
                Err(err) => Err(StoreError::Io(err)),
            };
            entries.push((key.to_string(), parsed));
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::filename;
    use serde_json::{Map, json};

    fn sample_record(name: &str) -> MetadataRecord {
        let mut extra = Map::new();
        extra.insert("seed".into(), json!("42"));
        MetadataRecord {
            filename: name.into(),
            image_url: "https://cdn.example/a.png".into(),
            thumbnail_url: "https://cdn.example/a-thumb.png".into(),
            file_id: "abc123".into(),
            prompt: "a lighthouse at dusk".into(),
            style: "photorealistic".into(),
            aspect_ratio: "1:1".into(),
            model: "flux-pro".into(),
            user_id: "user-1".into(),
            timestamp: "2026-08-05T12:00:00Z".into(),
            uploaded_at: "2026-08-05T12:00:01.000Z".into(),
            extra,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        let key = filename::validate("IMG_Test_001.png").unwrap();
        let record = sample_record("IMG_Test_001.png");
        store.put(&key, &record).await.unwrap();

        let loaded = store.get("IMG_Test_001.png").await.unwrap();
        assert_eq!(loaded, record);
        assert!(dir.path().join("IMG_Test_001.png.json").is_file());
    }

    #[tokio::test]
    async fn put_overwrites_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        let key = filename::validate("IMG_dup.png").unwrap();

        store.put(&key, &sample_record("IMG_dup.png")).await.unwrap();
        let mut second = sample_record("IMG_dup.png");
        second.prompt = "a second take".into();
        store.put(&key, &second).await.unwrap();

        assert_eq!(store.get("IMG_dup.png").await.unwrap().prompt, "a second take");
    }

    #[tokio::test]
    async fn get_missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        match store.get("does-not-exist").await {
            Err(StoreError::RecordNotFound(key)) => assert_eq!(key, "does-not-exist"),
            other => panic!("expected RecordNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn corrupt_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        std::fs::write(dir.path().join("IMG_bad.png.json"), "{ not json").unwrap();

        assert!(matches!(
            store.get("IMG_bad.png").await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn list_all_skips_nothing_and_flags_corrupt_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());

        for name in ["IMG_one.png", "IMG_two.png"] {
            let key = filename::validate(name).unwrap();
            store.put(&key, &sample_record(name)).await.unwrap();
        }
        std::fs::write(dir.path().join("IMG_corrupt.png.json"), "garbage").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let entries = store.list_all().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.iter().filter(|(_, r)| r.is_ok()).count(), 2);
        assert_eq!(entries.iter().filter(|(_, r)| r.is_err()).count(), 1);
    }

    #[tokio::test]
    async fn list_all_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("never-created"));

        assert!(store.list_all().await.unwrap().is_empty());
    }
}
