//! Shared application state for the project service.
//!
//! [`AppState`] owns a [`ProjectRegistry`]: every stored project revision
//! with its owner, and every uploaded asset as decoded bytes. Everything is
//! held in memory and lost on restart.

use std::collections::{BTreeMap, BTreeSet};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use keel_types::{
    AssetFile, AssetToSave, AssetWithFileName, LoadProjectResponse, OwnerId, PersistentModel,
    ProjectId, SaveProjectResponse, split_data_url,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;

/// Name given to projects saved without one.
pub const UNTITLED: &str = "Untitled";

/// A stored project and its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProject {
    /// The user that first saved the project.
    pub owner: OwnerId,
    /// Human-readable project name.
    pub title: String,
    /// When the project was first saved.
    pub created_at: DateTime<Utc>,
    /// When the project was last saved.
    pub modified_at: DateTime<Utc>,
    /// The latest revision.
    pub content: PersistentModel,
}

/// A decoded asset payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// MIME type the payload was uploaded with.
    pub mime_type: String,
    /// Raw payload bytes.
    pub bytes: Vec<u8>,
}

impl StoredAsset {
    /// Decode an uploaded data URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidPayload`] if the payload is not a base64
    /// data URL.
    pub fn decode(upload: &AssetToSave) -> Result<Self, ApiError> {
        let (mime, body) = split_data_url(&upload.base64).ok_or_else(|| {
            ApiError::InvalidPayload(format!("{} is not a base64 data URL", upload.file_name))
        })?;
        let bytes = STANDARD
            .decode(body)
            .map_err(|e| ApiError::InvalidPayload(format!("{}: {e}", upload.file_name)))?;
        let mime_type = if mime.is_empty() { &upload.file_type } else { mime };
        Ok(Self {
            mime_type: mime_type.to_owned(),
            bytes,
        })
    }

    /// Re-encode the payload as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Every project and asset the service knows about.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    allocated: BTreeSet<ProjectId>,
    projects: BTreeMap<ProjectId, StoredProject>,
    assets: BTreeMap<(ProjectId, String), StoredAsset>,
}

impl ProjectRegistry {
    /// Allocate an id no other project uses.
    pub fn allocate(&mut self) -> ProjectId {
        loop {
            let id = ProjectId::new(Uuid::new_v4().to_string());
            if !self.projects.contains_key(&id) && self.allocated.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Whether `user` may write to `id`.
    ///
    /// Projects nobody has saved yet are open to everyone.
    pub fn is_owner(&self, id: &ProjectId, user: &OwnerId) -> bool {
        self.projects.get(id).is_none_or(|p| &p.owner == user)
    }

    /// Store a revision and/or a new name for `id`.
    ///
    /// The first save of an id claims it for `user`. Omitted fields keep
    /// their stored values.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotOwner`] if another user owns the project, or
    /// [`ApiError::MissingContent`] if an unknown project is saved without
    /// content.
    pub fn save(
        &mut self,
        id: &ProjectId,
        user: &OwnerId,
        name: Option<String>,
        content: Option<PersistentModel>,
        now: DateTime<Utc>,
    ) -> Result<SaveProjectResponse, ApiError> {
        if !self.is_owner(id, user) {
            return Err(ApiError::NotOwner(id.clone()));
        }

        if let Some(project) = self.projects.get_mut(id) {
            if let Some(name) = name {
                project.title = name;
            }
            if let Some(content) = content {
                project.content = content;
            }
            project.modified_at = now;
        } else {
            let content = content.ok_or_else(|| ApiError::MissingContent(id.clone()))?;
            self.allocated.remove(id);
            self.projects.insert(
                id.clone(),
                StoredProject {
                    owner: user.clone(),
                    title: name.unwrap_or_else(|| UNTITLED.to_owned()),
                    created_at: now,
                    modified_at: now,
                    content,
                },
            );
        }

        Ok(SaveProjectResponse {
            id: id.clone(),
            owner_id: user.clone(),
        })
    }

    /// The stored project, if any.
    pub fn load(&self, id: &ProjectId) -> Option<LoadProjectResponse> {
        self.projects
            .get(id)
            .map(|p| LoadProjectResponse::ProjectLoaded {
                id: id.clone(),
                owner_id: p.owner.clone(),
                title: p.title.clone(),
                created_at: p.created_at,
                modified_at: p.modified_at,
                content: p.content.clone(),
            })
    }

    /// Store uploaded assets under `id`, replacing any with the same name.
    ///
    /// Nothing is stored unless every payload decodes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotOwner`] if another user owns the project, or
    /// [`ApiError::InvalidPayload`] if any payload is malformed.
    pub fn store_assets(
        &mut self,
        id: &ProjectId,
        user: &OwnerId,
        uploads: &[AssetToSave],
    ) -> Result<usize, ApiError> {
        if !self.is_owner(id, user) {
            return Err(ApiError::NotOwner(id.clone()));
        }
        let decoded = uploads
            .iter()
            .map(|upload| Ok((upload.file_name.clone(), StoredAsset::decode(upload)?)))
            .collect::<Result<Vec<_>, ApiError>>()?;
        let count = decoded.len();
        for (file_name, asset) in decoded {
            self.assets.insert((id.clone(), file_name), asset);
        }
        Ok(count)
    }

    /// Fill in the payload of every requested asset stored under `id`.
    ///
    /// Requests with no stored payload are returned unchanged.
    pub fn download_assets(
        &self,
        id: &ProjectId,
        requests: Vec<AssetWithFileName>,
    ) -> Vec<AssetWithFileName> {
        requests
            .into_iter()
            .map(|request| {
                match self.assets.get(&(id.clone(), request.file_name.clone())) {
                    Some(stored) => AssetWithFileName {
                        file: AssetFile::with_payload(stored.to_data_url()),
                        file_name: request.file_name,
                    },
                    None => request,
                }
            })
            .collect()
    }

    /// Number of stored projects.
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// The decoded asset stored under `id` and `file_name`, if any.
    pub fn asset(&self, id: &ProjectId, file_name: &str) -> Option<&StoredAsset> {
        self.assets.get(&(id.clone(), file_name.to_owned()))
    }
}

/// Shared state for the project service.
///
/// Wrapped in an `Arc` and shared across all handlers.
#[derive(Debug, Default)]
pub struct AppState {
    /// Stored projects and assets.
    pub registry: RwLock<ProjectRegistry>,
}

impl AppState {
    /// Create an empty service state.
    pub fn new() -> Self {
        Self::default()
    }
}
