//! Result actions reported by the persistence engine to the editor store.
//!
//! The engine never touches the editor's state directly. Every outcome that
//! the editor needs to reflect is emitted as a [`PersistenceAction`] through
//! the dispatch sink.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::ProjectId;
use crate::model::AssetFile;

/// Which storage location a project revision is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum BackendKind {
    /// The local key-value store on this machine.
    Local,
    /// The authoritative remote project service.
    Remote,
}

impl BackendKind {
    /// The backend that is authoritative for a session in this login state.
    pub const fn for_session(authenticated: bool) -> Self {
        if authenticated { Self::Remote } else { Self::Local }
    }
}

impl core::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// How a save request should be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum SaveMode {
    /// Write immediately, superseding any pending throttled save.
    Force,
    /// Coalesce with other throttled saves inside the throttle window.
    Throttle,
}

/// An outcome reported to the editor's state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum PersistenceAction {
    /// The editor's current project id changed.
    SetProjectId {
        /// The new current project id.
        id: ProjectId,
    },
    /// An asset file in the current project was replaced.
    UpdateFile {
        /// Path of the asset inside the project contents.
        file_path: String,
        /// The replacement asset.
        file: AssetFile,
    },
    /// The current project was forked from another project.
    SetForkedFromProjectId {
        /// Id of the project the current one was forked from.
        id: ProjectId,
    },
    /// A revision of a project was durably written.
    SaveCompleted {
        /// The project that was written.
        id: ProjectId,
        /// Where it was written.
        target: BackendKind,
    },
    /// A save with no waiting caller failed.
    SaveFailed {
        /// The project whose save failed.
        id: ProjectId,
        /// Human-readable failure description.
        reason: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn actions_carry_tag() {
        let json = serde_json::to_value(PersistenceAction::SetForkedFromProjectId {
            id: ProjectId::new("old"),
        })
        .unwrap();
        assert_eq!(json["action"], "SET_FORKED_FROM_PROJECT_ID");
        assert_eq!(json["id"], "old");
    }

    #[test]
    fn backend_for_session() {
        assert_eq!(BackendKind::for_session(true), BackendKind::Remote);
        assert_eq!(BackendKind::for_session(false), BackendKind::Local);
        assert_eq!(BackendKind::Remote.to_string(), "remote");
    }
}
