//! Error types for the persistence engine.
//!
//! Store failures surface unchanged through [`PersistenceError::Store`],
//! except ownership refusals, which are lifted into
//! [`PersistenceError::NotOwner`] so callers can match on them without
//! reaching into the store layer.

use keel_store::StoreError;
use keel_types::ProjectId;

/// Errors that can occur while orchestrating project persistence.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// A local or remote store operation failed.
    #[error("store error: {0}")]
    Store(#[source] StoreError),

    /// The session's user may not write to the project.
    #[error("not the owner of project {project_id}")]
    NotOwner {
        /// The project that was refused.
        project_id: ProjectId,
    },

    /// The operation needs a current project and none is set.
    #[error("no project is loaded")]
    NoProjectLoaded,

    /// The machine has been stopped and accepts no further commands.
    #[error("persistence machine stopped")]
    Stopped,

    /// The backend cannot perform the requested operation.
    #[error("unsupported by {backend} backend: {operation}")]
    Unsupported {
        /// The backend that was asked.
        backend: &'static str,
        /// What it was asked to do.
        operation: &'static str,
    },
}

impl From<StoreError> for PersistenceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotOwner(project_id) => Self::NotOwner { project_id },
            other => Self::Store(other),
        }
    }
}
