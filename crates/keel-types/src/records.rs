//! Records held by the local store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::ProjectId;
use crate::model::PersistentModel;

/// Prefix applied to a project id to form its local store key.
pub const LOCAL_PROJECT_KEY_PREFIX: &str = "project-";

/// Derive the local store key for a project.
pub fn local_project_key(id: &ProjectId) -> String {
    format!("{LOCAL_PROJECT_KEY_PREFIX}{id}")
}

/// Recover the project id from a local store key.
///
/// Returns `None` for keys that do not belong to a project record.
pub fn project_id_from_local_key(key: &str) -> Option<ProjectId> {
    key.strip_prefix(LOCAL_PROJECT_KEY_PREFIX)
        .filter(|id| !id.is_empty())
        .map(ProjectId::from)
}

/// A project revision stored on the local machine.
///
/// Created on the first local save of a project, overwritten by every later
/// local save, and deleted once the project migrates to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LocalProjectRecord {
    /// The stored revision.
    pub model: PersistentModel,
    /// When the record was first written.
    pub created_at: DateTime<Utc>,
    /// When the record was last overwritten.
    pub last_modified: DateTime<Utc>,
    /// Thumbnail image as a data URL, empty when none was captured.
    pub thumbnail: String,
    /// Human-readable project name.
    pub name: String,
}

impl LocalProjectRecord {
    /// Build the record for a save at `now`, carrying `created_at` forward
    /// from `previous` when the project was already stored locally.
    pub fn for_save(
        previous: Option<&Self>,
        model: PersistentModel,
        name: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            model,
            created_at: previous.map_or(now, |p| p.created_at),
            last_modified: now,
            thumbnail: previous.map(|p| p.thumbnail.clone()).unwrap_or_default(),
            name: name.to_owned(),
        }
    }
}

/// Summary of a locally stored project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LocalProjectSummary {
    /// The project's id.
    pub id: ProjectId,
    /// Human-readable project name.
    pub name: String,
    /// When the record was last overwritten.
    pub last_modified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn local_key_roundtrip() {
        let id = ProjectId::new("abc");
        let key = local_project_key(&id);
        assert_eq!(key, "project-abc");
        assert_eq!(project_id_from_local_key(&key), Some(id));
        assert_eq!(project_id_from_local_key("settings"), None);
        assert_eq!(project_id_from_local_key("project-"), None);
    }

    #[test]
    fn resave_keeps_creation_time() {
        let first_at = Utc::now();
        let first = LocalProjectRecord::for_save(None, PersistentModel::new(1), "One", first_at);
        assert_eq!(first.created_at, first_at);

        let later = first_at + Duration::seconds(5);
        let second =
            LocalProjectRecord::for_save(Some(&first), PersistentModel::new(2), "Two", later);
        assert_eq!(second.created_at, first_at);
        assert_eq!(second.last_modified, later);
        assert_eq!(second.name, "Two");
    }
}
