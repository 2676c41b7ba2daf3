//! Reference implementation of the Keel remote project service.
//!
//! Serves the HTTP contract that `keel_store::HttpRemoteStore` speaks:
//! project id allocation, project save/load with per-user ownership, and
//! asset upload/download. State lives in memory.
//!
//! # Modules
//!
//! - [`router`] -- Route table and middleware
//! - [`handlers`] -- Endpoint handlers and caller identification
//! - [`state`] -- In-memory project and asset registry
//! - [`server`] -- Listener lifecycle
//! - [`error`] -- API errors as JSON responses

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, serve, start_server};
pub use state::{AppState, ProjectRegistry};
