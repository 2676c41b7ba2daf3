//! Backend over the local store.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use keel_store::LocalStore;
use keel_types::{
    AssetWithFileName, BackendKind, LocalProjectRecord, LocalProjectSummary, PersistentModel,
    ProjectId, local_project_key, project_id_from_local_key,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::Mutex;

use super::{LoadedProject, PersistenceBackend};
use crate::error::PersistenceError;

/// Length of ids generated for projects created offline.
const LOCAL_ID_LENGTH: usize = 12;

/// Persists projects in the local store.
///
/// Local records are always self-contained, so asset uploads are no-ops and
/// the session's user owns every local project.
pub struct LocalBackend {
    store: Arc<dyn LocalStore>,
    /// Every id this backend has handed out.
    issued: Mutex<HashSet<ProjectId>>,
}

impl LocalBackend {
    /// Wrap a local store.
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            issued: Mutex::new(HashSet::new()),
        }
    }

    /// Delete the local record for `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Store`] if the delete fails.
    pub async fn delete_project(&self, id: &ProjectId) -> Result<(), PersistenceError> {
        self.store.remove(&local_project_key(id)).await?;
        Ok(())
    }

    /// Summaries of every local project, most recently modified first.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Store`] if listing or reading fails.
    pub async fn list_projects(&self) -> Result<Vec<LocalProjectSummary>, PersistenceError> {
        let mut summaries = Vec::new();
        for key in self.store.keys().await? {
            let Some(id) = project_id_from_local_key(&key) else {
                continue;
            };
            if let Some(record) = self.store.get(&key).await? {
                summaries.push(LocalProjectSummary {
                    id,
                    name: record.name,
                    last_modified: record.last_modified,
                });
            }
        }
        summaries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(summaries)
    }
}

fn random_local_id() -> ProjectId {
    let id: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(LOCAL_ID_LENGTH)
        .map(char::from)
        .collect();
    ProjectId::new(id)
}

#[async_trait]
impl PersistenceBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn create_project_id(&self) -> Result<ProjectId, PersistenceError> {
        let mut issued = self.issued.lock().await;
        loop {
            let candidate = random_local_id();
            if issued.contains(&candidate) {
                continue;
            }
            if self.store.get(&local_project_key(&candidate)).await?.is_some() {
                continue;
            }
            issued.insert(candidate.clone());
            return Ok(candidate);
        }
    }

    async fn save_project(
        &self,
        id: &ProjectId,
        model: &PersistentModel,
        name: &str,
    ) -> Result<(), PersistenceError> {
        let key = local_project_key(id);
        let previous = self.store.get(&key).await?;
        let record =
            LocalProjectRecord::for_save(previous.as_ref(), model.clone(), name, Utc::now());
        self.store.set(&key, &record).await?;
        tracing::debug!(project_id = %id, "Saved project locally");
        Ok(())
    }

    async fn load_project(
        &self,
        id: &ProjectId,
    ) -> Result<Option<LoadedProject>, PersistenceError> {
        let record = self.store.get(&local_project_key(id)).await?;
        Ok(record.map(|r| LoadedProject {
            name: r.name,
            model: r.model,
        }))
    }

    async fn download_assets(
        &self,
        _id: &ProjectId,
        assets: &[AssetWithFileName],
    ) -> Result<Vec<AssetWithFileName>, PersistenceError> {
        if assets.iter().all(|a| a.file.has_payload()) {
            return Ok(assets.to_vec());
        }
        Err(PersistenceError::Unsupported {
            backend: "local",
            operation: "download asset payloads",
        })
    }

    async fn upload_assets(
        &self,
        _id: &ProjectId,
        _assets: &[AssetWithFileName],
    ) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn check_ownership(&self, _id: &ProjectId) -> Result<bool, PersistenceError> {
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keel_store::MemoryLocalStore;
    use keel_types::{AssetFile, ProjectFile};

    use super::*;

    #[tokio::test]
    async fn generated_ids_are_unique_and_unused() {
        let store = MemoryLocalStore::new();
        let backend = LocalBackend::new(Arc::new(store));

        let mut seen = HashSet::new();
        for _ in 0..50 {
            let id = backend.create_project_id().await.unwrap();
            assert_eq!(id.as_str().len(), LOCAL_ID_LENGTH);
            assert!(seen.insert(id));
        }
    }

    #[tokio::test]
    async fn save_load_list_delete() {
        let store = MemoryLocalStore::new();
        let backend = LocalBackend::new(Arc::new(store.clone()));
        let id = backend.create_project_id().await.unwrap();

        backend.save_project(&id, &PersistentModel::new(1), "Draft").await.unwrap();
        let loaded = backend.load_project(&id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Draft");

        let listed = backend.list_projects().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().unwrap().id, id);

        backend.delete_project(&id).await.unwrap();
        assert!(backend.load_project(&id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn cannot_download_missing_payloads() {
        let backend = LocalBackend::new(Arc::new(MemoryLocalStore::new()));
        let id = ProjectId::new("p");
        let payload = AssetFile::with_payload("data:image/png;base64,AA==");
        let complete = PersistentModel::new(1)
            .with_file("/a.png", ProjectFile::AssetFile(payload))
            .asset_entries();
        assert_eq!(backend.download_assets(&id, &complete).await.unwrap(), complete);

        let missing = PersistentModel::new(1)
            .with_file("/a.png", ProjectFile::AssetFile(AssetFile::without_payload()))
            .asset_entries();
        let result = backend.download_assets(&id, &missing).await;
        assert!(matches!(result, Err(PersistenceError::Unsupported { .. })));
    }
}
