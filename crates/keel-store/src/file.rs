//! File-backed local store.
//!
//! Each record lives in its own JSON file named after its key. Keys are
//! percent-encoded, so any project id maps to a single file name inside the
//! directory:
//!
//! ```text
//! directory/
//! ├── project-4fQx81bA.json
//! └── project-team%2Fsite.v2.json
//! ```
//!
//! Writes go to a temporary sibling first and are then renamed over the
//! target, so a crash mid-write never leaves a truncated record behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use keel_types::LocalProjectRecord;

use crate::error::StoreError;
use crate::local::LocalStore;

/// File extension used for record files.
const RECORD_EXTENSION: &str = "json";

/// Local store keeping one JSON file per record in a directory.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    directory: PathBuf,
}

impl FileLocalStore {
    /// Open (and create if missing) a store rooted at `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;
        tracing::debug!(directory = %directory.display(), "Opened file local store");
        Ok(Self { directory })
    }

    /// The directory records are stored in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        let file_name = urlencoding::encode(key);
        Ok(self.directory.join(format!("{file_name}.{RECORD_EXTENSION}")))
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn get(&self, key: &str) -> Result<Option<LocalProjectRecord>, StoreError> {
        let path = self.record_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, record: &LocalProjectRecord) -> Result<(), StoreError> {
        let path = self.record_path(key)?;
        let tmp_path = path.with_extension(format!("{RECORD_EXTENSION}.tmp"));
        let bytes = serde_json::to_vec_pretty(record)?;

        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::debug!(key, bytes = bytes.len(), "Wrote local record");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match urlencoding::decode(stem) {
                Ok(key) => keys.push(key.into_owned()),
                Err(e) => {
                    tracing::warn!(file = %path.display(), "Skipping undecodable record name: {e}");
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
