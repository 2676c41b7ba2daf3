//! Shared type definitions for the Keel project persistence engine.
//!
//! This crate is the single source of truth for the values that flow between
//! the persistence engine, its storage backends, and the editor front end.
//! Types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Opaque string identifiers for projects and owners
//! - [`model`] -- The persistent project model, its files and assets
//! - [`records`] -- Local store records and key derivation
//! - [`actions`] -- Result actions dispatched to the editor store
//! - [`wire`] -- Remote project service request/response bodies

pub mod actions;
pub mod ids;
pub mod model;
pub mod records;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use actions::{BackendKind, PersistenceAction, SaveMode};
pub use ids::{OwnerId, ProjectId};
pub use model::{
    AssetFile, AssetWithFileName, PersistentModel, ProjectFile, TextFile, split_data_url,
};
pub use records::{
    LOCAL_PROJECT_KEY_PREFIX, LocalProjectRecord, LocalProjectSummary, local_project_key,
    project_id_from_local_key,
};
pub use wire::{
    AssetToSave, CreateProjectResponse, LoadProjectResponse, OwnershipResponse,
    SaveProjectRequest, SaveProjectResponse, USER_HEADER,
};
