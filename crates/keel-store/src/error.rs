//! Error types for the storage layer.
//!
//! All errors are propagated via [`StoreError`] which wraps the underlying
//! I/O, [`serde_json`] and [`reqwest`] errors with additional context about
//! which operation failed.

use keel_types::ProjectId;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A local filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request to the remote store could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with an unexpected status code.
    #[error("Remote store returned {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, or a description when it could not be read.
        message: String,
    },

    /// The remote store refused a write because another user owns the project.
    #[error("Project {0} is owned by another user")]
    NotOwner(ProjectId),

    /// A requested asset has no stored payload.
    #[error("Asset {file_name} not found in project {project_id}")]
    AssetNotFound {
        /// The project that was searched.
        project_id: ProjectId,
        /// Path of the missing asset.
        file_name: String,
    },

    /// A local store key contains characters that cannot be used on disk.
    #[error("Invalid local store key: {0}")]
    InvalidKey(String),

    /// The remote store rejected the request.
    #[error("Remote store rejected the request: {0}")]
    Rejected(String),
}
