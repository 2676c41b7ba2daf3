//! Local key-value store for project records.
//!
//! The local store holds [`LocalProjectRecord`] values under keys derived
//! from project ids (see [`keel_types::local_project_key`]). It is the
//! authoritative location for projects while the user is logged out.
//!
//! # Implementations
//!
//! | Type | Backing | Use |
//! |------|---------|-----|
//! | [`MemoryLocalStore`] | `BTreeMap` behind a lock | tests, ephemeral sessions |
//! | [`FileLocalStore`] | one JSON file per key | desktop sessions |
//!
//! [`FileLocalStore`]: crate::file::FileLocalStore

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use keel_types::LocalProjectRecord;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Key-value access to locally stored project records.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read the record stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read or deserialization fails.
    async fn get(&self, key: &str) -> Result<Option<LocalProjectRecord>, StoreError>;

    /// Store `record` at `key`, replacing any existing record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the write fails.
    async fn set(&self, key: &str, record: &LocalProjectRecord) -> Result<(), StoreError>;

    /// Delete the record at `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// List every key currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the listing fails.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory local store.
///
/// Clones share the same underlying map, so a test can keep a handle and
/// inspect what the persistence engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStore {
    records: Arc<RwLock<BTreeMap<String, LocalProjectRecord>>>,
}

impl MemoryLocalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, key: &str) -> Result<Option<LocalProjectRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, record: &LocalProjectRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(key.to_owned(), record.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}
