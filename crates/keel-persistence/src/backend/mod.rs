//! The uniform backend interface the persistence machine talks to.
//!
//! The machine never touches a store directly. It picks a
//! [`PersistenceBackend`] for each operation (local while logged out,
//! remote while logged in, remote for asset downloads) and calls through
//! this trait.
//!
//! # Submodules
//!
//! - [`local`] -- Backend over a [`LocalStore`](keel_store::LocalStore).
//! - [`remote`] -- Backend over a [`RemoteStore`](keel_store::RemoteStore).

pub mod local;
pub mod remote;

use async_trait::async_trait;
use keel_types::{AssetWithFileName, BackendKind, PersistentModel, ProjectId};

use crate::error::PersistenceError;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

/// A project found by [`PersistenceBackend::load_project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProject {
    /// Human-readable project name.
    pub name: String,
    /// The latest stored revision.
    pub model: PersistentModel,
}

/// Storage capability used by the persistence machine.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Which kind of storage this backend writes to.
    fn kind(&self) -> BackendKind;

    /// Allocate a project id that has not been used before.
    async fn create_project_id(&self) -> Result<ProjectId, PersistenceError>;

    /// Persist a revision and name under `id`.
    async fn save_project(
        &self,
        id: &ProjectId,
        model: &PersistentModel,
        name: &str,
    ) -> Result<(), PersistenceError>;

    /// Look up the latest revision stored under `id` in this backend only.
    async fn load_project(&self, id: &ProjectId) -> Result<Option<LoadedProject>, PersistenceError>;

    /// Fill in payloads for assets stored under `id`.
    ///
    /// Assets that already carry a payload are returned as they are.
    async fn download_assets(
        &self,
        id: &ProjectId,
        assets: &[AssetWithFileName],
    ) -> Result<Vec<AssetWithFileName>, PersistenceError>;

    /// Store asset payloads under `id`.
    async fn upload_assets(
        &self,
        id: &ProjectId,
        assets: &[AssetWithFileName],
    ) -> Result<(), PersistenceError>;

    /// Whether the session's user may write to `id`.
    async fn check_ownership(&self, id: &ProjectId) -> Result<bool, PersistenceError>;
}
