//! Persistence orchestration for Keel projects.
//!
//! Decides, for every editor action, whether a project is stored locally or
//! on the remote project service, keeps the two consistent across login and
//! logout, coalesces bursts of saves, and forks projects together with
//! their assets.
//!
//! # Architecture
//!
//! ```text
//! Editor
//!   |  create_new / save / load / fork / login / logout / stop
//!   v
//! PersistenceMachine (actor, owns SessionState)
//!   |-- ThrottleScheduler   (one pending save, one deadline)
//!   |-- sync_fork_assets    (embed payloads from the source project)
//!   |-- LocalBackend  --> keel_store::LocalStore
//!   +-- RemoteBackend --> keel_store::RemoteStore
//!   |
//!   +--> PersistenceEvents (not found, created/loaded, dispatch actions)
//! ```
//!
//! # Modules
//!
//! - [`machine`] -- The orchestrator and its command handle
//! - [`backend`] -- Uniform backend interface over the two stores
//! - [`throttle`] -- Single-timer save debouncer
//! - [`fork`] -- Asset payload synchronization for forks
//! - [`events`] -- Outbound notification contract
//! - [`config`] -- `keel-config.yaml` loading
//! - [`error`] -- Shared error types

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod fork;
pub mod machine;
pub mod throttle;

// Re-export primary types for convenience.
pub use backend::{LoadedProject, LocalBackend, PersistenceBackend, RemoteBackend};
pub use config::{ConfigError, KeelConfig};
pub use error::PersistenceError;
pub use events::{NoOpEvents, PersistenceEvents, RecordedEvent, RecordingEvents};
pub use fork::{ForkedModel, sync_fork_assets};
pub use machine::{LoadOutcome, MachineSettings, PersistenceMachine, SessionSnapshot};
pub use throttle::{PendingSave, ThrottleScheduler};
