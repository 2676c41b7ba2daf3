//! Backend over the remote project service.

use std::sync::Arc;

use async_trait::async_trait;
use keel_store::RemoteStore;
use keel_types::{
    AssetToSave, AssetWithFileName, BackendKind, LoadProjectResponse, PersistentModel, ProjectId,
};

use super::{LoadedProject, PersistenceBackend};
use crate::error::PersistenceError;

/// Persists projects through the remote project service.
pub struct RemoteBackend {
    store: Arc<dyn RemoteStore>,
}

impl RemoteBackend {
    /// Wrap a remote store.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PersistenceBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn create_project_id(&self) -> Result<ProjectId, PersistenceError> {
        Ok(self.store.create_project_id().await?)
    }

    async fn save_project(
        &self,
        id: &ProjectId,
        model: &PersistentModel,
        name: &str,
    ) -> Result<(), PersistenceError> {
        let response = self.store.save_project(id, Some(model), Some(name)).await?;
        tracing::debug!(project_id = %id, owner = %response.owner_id, "Saved project remotely");
        Ok(())
    }

    async fn load_project(
        &self,
        id: &ProjectId,
    ) -> Result<Option<LoadedProject>, PersistenceError> {
        match self.store.load_project(id).await? {
            LoadProjectResponse::ProjectLoaded { title, content, .. } => Ok(Some(LoadedProject {
                name: title,
                model: content,
            })),
            LoadProjectResponse::ProjectNotFound => Ok(None),
        }
    }

    async fn download_assets(
        &self,
        id: &ProjectId,
        assets: &[AssetWithFileName],
    ) -> Result<Vec<AssetWithFileName>, PersistenceError> {
        Ok(self.store.download_assets(id, assets).await?)
    }

    async fn upload_assets(
        &self,
        id: &ProjectId,
        assets: &[AssetWithFileName],
    ) -> Result<(), PersistenceError> {
        let uploads: Vec<AssetToSave> = assets
            .iter()
            .filter_map(|a| AssetToSave::from_asset(&a.file_name, &a.file))
            .collect();
        if uploads.is_empty() {
            return Ok(());
        }
        self.store.save_assets(id, &uploads).await?;
        Ok(())
    }

    async fn check_ownership(&self, id: &ProjectId) -> Result<bool, PersistenceError> {
        Ok(self.store.check_ownership(id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keel_store::MemoryRemoteStore;
    use keel_types::AssetFile;

    use super::*;

    #[tokio::test]
    async fn uploads_skip_payloadless_assets() {
        let store = MemoryRemoteStore::new("alice");
        let backend = RemoteBackend::new(Arc::new(store.clone()));
        let id = ProjectId::new("p");

        let assets = vec![
            AssetWithFileName {
                file_name: "/a.png".to_owned(),
                file: AssetFile::with_payload("data:image/png;base64,AA=="),
            },
            AssetWithFileName {
                file_name: "/b.png".to_owned(),
                file: AssetFile::without_payload(),
            },
        ];
        backend.upload_assets(&id, &assets).await.unwrap();

        let uploads = store.uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads.first().unwrap().file_names, vec!["/a.png".to_owned()]);

        backend.upload_assets(&id, assets.get(1..).unwrap()).await.unwrap();
        assert_eq!(store.uploads().await.len(), 1);
    }

    #[tokio::test]
    async fn load_maps_not_found() {
        let store = MemoryRemoteStore::new("alice");
        let backend = RemoteBackend::new(Arc::new(store.clone()));
        let id = ProjectId::new("p");
        assert!(backend.load_project(&id).await.unwrap().is_none());

        store.insert_project(id.clone(), "alice", "Title", PersistentModel::new(2)).await;
        let loaded = backend.load_project(&id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Title");
    }

    #[tokio::test]
    async fn foreign_projects_are_refused() {
        let store = MemoryRemoteStore::new("alice");
        let id = ProjectId::new("p");
        store.insert_project(id.clone(), "bob", "Bob's", PersistentModel::new(1)).await;
        let backend = RemoteBackend::new(Arc::new(store));

        assert!(!backend.check_ownership(&id).await.unwrap());
        let result = backend.save_project(&id, &PersistentModel::new(2), "Mine").await;
        assert!(matches!(result, Err(PersistenceError::NotOwner { .. })));
    }
}
