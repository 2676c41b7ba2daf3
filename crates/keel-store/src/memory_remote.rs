//! In-memory remote store.
//!
//! Behaves like the remote project service for a single calling user and
//! records every save, upload and download so tests can assert on the exact
//! sequence of remote writes. Failures can be injected per project id or
//! for the whole store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keel_types::{
    AssetFile, AssetToSave, AssetWithFileName, LoadProjectResponse, OwnerId, PersistentModel,
    ProjectId, SaveProjectResponse,
};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::remote::RemoteStore;

/// One call to [`RemoteStore::save_project`] as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSave {
    /// Target project.
    pub id: ProjectId,
    /// Revision sent, if any.
    pub content: Option<PersistentModel>,
    /// Name sent, if any.
    pub name: Option<String>,
}

/// One call to [`RemoteStore::save_assets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUpload {
    /// Target project.
    pub id: ProjectId,
    /// Uploaded asset paths in upload order.
    pub file_names: Vec<String>,
}

/// One call to [`RemoteStore::download_assets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDownload {
    /// Project the payloads were read from.
    pub id: ProjectId,
    /// Requested asset paths in request order.
    pub file_names: Vec<String>,
}

/// A stored project.
#[derive(Debug, Clone)]
struct StoredProject {
    owner: OwnerId,
    title: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    content: PersistentModel,
}

#[derive(Debug, Default)]
struct Inner {
    projects: BTreeMap<ProjectId, StoredProject>,
    assets: BTreeMap<(ProjectId, String), String>,
    saves: Vec<RemoteSave>,
    uploads: Vec<RemoteUpload>,
    downloads: Vec<RemoteDownload>,
    failing: BTreeSet<ProjectId>,
    unavailable: bool,
}

impl Inner {
    fn ensure_available(&self, id: Option<&ProjectId>) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Rejected("remote store unavailable".to_owned()));
        }
        if let Some(id) = id.filter(|id| self.failing.contains(*id)) {
            return Err(StoreError::Rejected(format!("injected failure for {id}")));
        }
        Ok(())
    }

    fn is_owner(&self, id: &ProjectId, user: &OwnerId) -> bool {
        self.projects.get(id).is_none_or(|p| &p.owner == user)
    }
}

/// Remote store held in memory.
///
/// Clones share state, so a test keeps one handle for inspection while the
/// persistence engine owns another.
#[derive(Debug, Clone)]
pub struct MemoryRemoteStore {
    user: OwnerId,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRemoteStore {
    /// Create an empty store acting for `user`.
    pub fn new(user: impl Into<OwnerId>) -> Self {
        Self {
            user: user.into(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// A handle on the same data acting for a different user.
    #[must_use]
    pub fn as_user(&self, user: impl Into<OwnerId>) -> Self {
        Self {
            user: user.into(),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Store a project directly, bypassing the save log.
    pub async fn insert_project(
        &self,
        id: ProjectId,
        owner: impl Into<OwnerId>,
        title: &str,
        content: PersistentModel,
    ) {
        let now = Utc::now();
        self.inner.lock().await.projects.insert(
            id,
            StoredProject {
                owner: owner.into(),
                title: title.to_owned(),
                created_at: now,
                modified_at: now,
                content,
            },
        );
    }

    /// Store an asset payload directly, bypassing the upload log.
    pub async fn seed_asset(&self, id: &ProjectId, file_name: &str, payload: &str) {
        self.inner
            .lock()
            .await
            .assets
            .insert((id.clone(), file_name.to_owned()), payload.to_owned());
    }

    /// Make every call touching `id` fail until cleared.
    pub async fn fail_project(&self, id: &ProjectId) {
        self.inner.lock().await.failing.insert(id.clone());
    }

    /// Stop failing calls touching `id`.
    pub async fn clear_failure(&self, id: &ProjectId) {
        self.inner.lock().await.failing.remove(id);
    }

    /// Make every call fail (or succeed again) regardless of project.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// Every successful save, in call order.
    pub async fn saves(&self) -> Vec<RemoteSave> {
        self.inner.lock().await.saves.clone()
    }

    /// Revisions sent to `id`, in call order.
    pub async fn saved_models(&self, id: &ProjectId) -> Vec<PersistentModel> {
        self.inner
            .lock()
            .await
            .saves
            .iter()
            .filter(|s| &s.id == id)
            .filter_map(|s| s.content.clone())
            .collect()
    }

    /// Every successful upload, in call order.
    pub async fn uploads(&self) -> Vec<RemoteUpload> {
        self.inner.lock().await.uploads.clone()
    }

    /// Every download, in call order.
    pub async fn downloads(&self) -> Vec<RemoteDownload> {
        self.inner.lock().await.downloads.clone()
    }

    /// The latest stored revision of `id`.
    pub async fn stored_model(&self, id: &ProjectId) -> Option<PersistentModel> {
        self.inner
            .lock()
            .await
            .projects
            .get(id)
            .map(|p| p.content.clone())
    }

    /// The stored payload of one asset.
    pub async fn stored_asset(&self, id: &ProjectId, file_name: &str) -> Option<String> {
        self.inner
            .lock()
            .await
            .assets
            .get(&(id.clone(), file_name.to_owned()))
            .cloned()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn create_project_id(&self) -> Result<ProjectId, StoreError> {
        self.inner.lock().await.ensure_available(None)?;
        Ok(ProjectId::new(uuid::Uuid::new_v4().to_string()))
    }

    async fn save_project(
        &self,
        id: &ProjectId,
        content: Option<&PersistentModel>,
        name: Option<&str>,
    ) -> Result<SaveProjectResponse, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_available(Some(id))?;
        if !inner.is_owner(id, &self.user) {
            return Err(StoreError::NotOwner(id.clone()));
        }

        let now = Utc::now();
        match inner.projects.get_mut(id) {
            Some(project) => {
                if let Some(content) = content {
                    project.content = content.clone();
                }
                if let Some(name) = name {
                    name.clone_into(&mut project.title);
                }
                project.modified_at = now;
            }
            None => {
                let content = content
                    .cloned()
                    .ok_or_else(|| StoreError::Rejected(format!("project {id} has no content")))?;
                inner.projects.insert(
                    id.clone(),
                    StoredProject {
                        owner: self.user.clone(),
                        title: name.unwrap_or_default().to_owned(),
                        created_at: now,
                        modified_at: now,
                        content,
                    },
                );
            }
        }

        inner.saves.push(RemoteSave {
            id: id.clone(),
            content: content.cloned(),
            name: name.map(ToOwned::to_owned),
        });
        Ok(SaveProjectResponse {
            id: id.clone(),
            owner_id: self.user.clone(),
        })
    }

    async fn load_project(&self, id: &ProjectId) -> Result<LoadProjectResponse, StoreError> {
        let inner = self.inner.lock().await;
        inner.ensure_available(Some(id))?;
        Ok(inner
            .projects
            .get(id)
            .map_or(LoadProjectResponse::ProjectNotFound, |p| {
                LoadProjectResponse::ProjectLoaded {
                    id: id.clone(),
                    owner_id: p.owner.clone(),
                    title: p.title.clone(),
                    created_at: p.created_at,
                    modified_at: p.modified_at,
                    content: p.content.clone(),
                }
            }))
    }

    async fn check_ownership(&self, id: &ProjectId) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        inner.ensure_available(Some(id))?;
        Ok(inner.is_owner(id, &self.user))
    }

    async fn save_assets(&self, id: &ProjectId, assets: &[AssetToSave]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_available(Some(id))?;
        if !inner.is_owner(id, &self.user) {
            return Err(StoreError::NotOwner(id.clone()));
        }
        for asset in assets {
            inner
                .assets
                .insert((id.clone(), asset.file_name.clone()), asset.base64.clone());
        }
        inner.uploads.push(RemoteUpload {
            id: id.clone(),
            file_names: assets.iter().map(|a| a.file_name.clone()).collect(),
        });
        Ok(())
    }

    async fn download_assets(
        &self,
        id: &ProjectId,
        assets: &[AssetWithFileName],
    ) -> Result<Vec<AssetWithFileName>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_available(Some(id))?;
        inner.downloads.push(RemoteDownload {
            id: id.clone(),
            file_names: assets.iter().map(|a| a.file_name.clone()).collect(),
        });

        Ok(assets
            .iter()
            .map(|asset| {
                if asset.file.has_payload() {
                    return asset.clone();
                }
                let stored = inner.assets.get(&(id.clone(), asset.file_name.clone()));
                AssetWithFileName {
                    file_name: asset.file_name.clone(),
                    file: stored.map_or_else(AssetFile::without_payload, AssetFile::with_payload),
                }
            })
            .collect())
    }
}
