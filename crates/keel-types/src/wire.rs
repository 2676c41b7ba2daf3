//! Request and response bodies exchanged with the remote project service.
//!
//! Shared by the HTTP client in `keel-store` and the reference service in
//! `keel-server` so both sides agree on the JSON shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{OwnerId, ProjectId};
use crate::model::{AssetFile, PersistentModel};

/// Header carrying the calling user's identity.
pub const USER_HEADER: &str = "x-keel-user";

/// Response to a project id allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CreateProjectResponse {
    /// The freshly allocated id.
    pub id: ProjectId,
}

/// Body of a project save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SaveProjectRequest {
    /// New project name, or `None` to keep the stored one.
    pub name: Option<String>,
    /// New revision, or `None` to keep the stored one.
    pub content: Option<PersistentModel>,
}

/// Response to a project save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SaveProjectResponse {
    /// The saved project's id.
    pub id: ProjectId,
    /// The user that owns the project.
    pub owner_id: OwnerId,
}

/// Response to a project load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export, export_to = "bindings/")]
pub enum LoadProjectResponse {
    /// The project exists.
    #[serde(rename_all = "camelCase")]
    ProjectLoaded {
        /// The project's id.
        id: ProjectId,
        /// The user that owns the project.
        owner_id: OwnerId,
        /// Human-readable project name.
        title: String,
        /// When the project was first saved.
        created_at: DateTime<Utc>,
        /// When the project was last saved.
        modified_at: DateTime<Utc>,
        /// The latest stored revision.
        content: PersistentModel,
    },
    /// No project is stored under the requested id.
    ProjectNotFound,
}

/// Response to an ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct OwnershipResponse {
    /// Whether the calling user may write to the project.
    pub is_owner: bool,
}

/// An asset payload pushed to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AssetToSave {
    /// MIME type of the payload.
    pub file_type: String,
    /// Payload as a data URL.
    pub base64: String,
    /// Path of the asset inside the project contents.
    pub file_name: String,
}

impl AssetToSave {
    /// Build an upload entry from an asset that carries its payload.
    ///
    /// Returns `None` when the asset has no inline payload.
    pub fn from_asset(file_name: &str, asset: &AssetFile) -> Option<Self> {
        let base64 = asset.base64.clone()?;
        let file_type = asset
            .mime_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        Some(Self {
            file_type,
            base64,
            file_name: file_name.to_owned(),
        })
    }
}
