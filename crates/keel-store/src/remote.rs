//! Remote project service contract.
//!
//! The remote store allocates project ids, keeps the latest revision of each
//! project, and stores asset payloads per project. It enforces ownership:
//! only the user that first saved a project may write to it again.

use async_trait::async_trait;
use keel_types::{
    AssetToSave, AssetWithFileName, LoadProjectResponse, PersistentModel, ProjectId,
    SaveProjectResponse,
};

use crate::error::StoreError;

/// Access to the remote project service on behalf of one user.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Allocate a new, globally unique project id.
    async fn create_project_id(&self) -> Result<ProjectId, StoreError>;

    /// Store a revision and/or a new name for a project.
    ///
    /// `None` leaves the corresponding stored value unchanged. Fails with
    /// [`StoreError::NotOwner`] when another user owns the project.
    async fn save_project(
        &self,
        id: &ProjectId,
        content: Option<&PersistentModel>,
        name: Option<&str>,
    ) -> Result<SaveProjectResponse, StoreError>;

    /// Fetch the latest stored revision of a project.
    async fn load_project(&self, id: &ProjectId) -> Result<LoadProjectResponse, StoreError>;

    /// Whether the calling user may write to the project.
    ///
    /// Unclaimed ids answer `true`.
    async fn check_ownership(&self, id: &ProjectId) -> Result<bool, StoreError>;

    /// Upload asset payloads under a project.
    async fn save_assets(&self, id: &ProjectId, assets: &[AssetToSave]) -> Result<(), StoreError>;

    /// Fill in payloads for assets stored under a project.
    ///
    /// The result has one entry per requested asset in request order. An
    /// asset with no stored payload comes back unchanged.
    async fn download_assets(
        &self,
        id: &ProjectId,
        assets: &[AssetWithFileName],
    ) -> Result<Vec<AssetWithFileName>, StoreError>;
}
