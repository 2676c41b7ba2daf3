//! Storage layer for the Keel project persistence engine.
//!
//! Projects live in one of two places: a local key-value store on the
//! user's machine, or a remote project service reached over the network.
//! This crate defines both contracts and their implementations. Deciding
//! which store a project belongs in is the job of `keel-persistence`.
//!
//! # Architecture
//!
//! ```text
//! keel-persistence
//!     |
//!     +-- LocalStore  --> MemoryLocalStore  (tests, ephemeral)
//!     |               --> FileLocalStore    (one JSON file per record)
//!     |
//!     +-- RemoteStore --> HttpRemoteStore   (keel-server over HTTP)
//!                     --> MemoryRemoteStore (tests, with call logs)
//! ```
//!
//! # Modules
//!
//! - [`local`] -- Local store contract and in-memory implementation
//! - [`file`] -- File-backed local store
//! - [`remote`] -- Remote store contract
//! - [`http`] -- HTTP remote store client
//! - [`memory_remote`] -- In-memory remote store with call logs
//! - [`error`] -- Shared error types

pub mod error;
pub mod file;
pub mod http;
pub mod local;
pub mod memory_remote;
pub mod remote;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use file::FileLocalStore;
pub use http::HttpRemoteStore;
pub use local::{LocalStore, MemoryLocalStore};
pub use memory_remote::{MemoryRemoteStore, RemoteDownload, RemoteSave, RemoteUpload};
pub use remote::RemoteStore;
