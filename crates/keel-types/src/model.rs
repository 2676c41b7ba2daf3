//! The persistent project model and the files it contains.
//!
//! A [`PersistentModel`] is one revision of a project. The persistence engine
//! treats it as an opaque value: it is written and read whole, compared only
//! by structural equality, and never mutated in place. The one exception is
//! forking, which needs to see [`AssetFile`] entries to make their payloads
//! self-contained. Every update goes through [`PersistentModel::with_file`],
//! which returns a new value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One revision of a project's full state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PersistentModel {
    /// Identifier of the application the project was created with, if any.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Schema version of the project contents.
    pub project_version: u32,
    /// Free-form description shown in project listings.
    #[serde(default)]
    pub project_description: String,
    /// Project files keyed by their path inside the project.
    ///
    /// A [`BTreeMap`] keeps iteration in path order, which is the order asset
    /// entries are reported and processed in.
    pub project_contents: BTreeMap<String, ProjectFile>,
}

impl PersistentModel {
    /// Create an empty model at the given schema version.
    pub const fn new(project_version: u32) -> Self {
        Self {
            app_id: None,
            project_version,
            project_description: String::new(),
            project_contents: BTreeMap::new(),
        }
    }

    /// Return a copy of this model with `file` stored at `path`.
    ///
    /// Any existing entry at `path` is replaced. The receiver is untouched.
    #[must_use]
    pub fn with_file(&self, path: impl Into<String>, file: ProjectFile) -> Self {
        let mut next = self.clone();
        next.project_contents.insert(path.into(), file);
        next
    }

    /// Look up the file stored at `path`.
    pub fn file(&self, path: &str) -> Option<&ProjectFile> {
        self.project_contents.get(path)
    }

    /// Collect every asset entry in path order.
    pub fn asset_entries(&self) -> Vec<AssetWithFileName> {
        self.project_contents
            .iter()
            .filter_map(|(path, file)| match file {
                ProjectFile::AssetFile(asset) => Some(AssetWithFileName {
                    file_name: path.clone(),
                    file: asset.clone(),
                }),
                ProjectFile::TextFile(_) | ProjectFile::Directory => None,
            })
            .collect()
    }

    /// Whether every asset in the model carries an inline payload.
    pub fn assets_self_contained(&self) -> bool {
        self.project_contents.values().all(|file| match file {
            ProjectFile::AssetFile(asset) => asset.has_payload(),
            ProjectFile::TextFile(_) | ProjectFile::Directory => true,
        })
    }
}

/// A single entry in a project's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ProjectFile {
    /// A source file edited as text.
    TextFile(TextFile),
    /// A binary resource such as an image or font.
    AssetFile(AssetFile),
    /// A directory marker.
    Directory,
}

/// A text source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TextFile {
    /// The file's source code.
    pub code: String,
    /// Milliseconds since the Unix epoch of the last edit.
    pub last_revised_time: i64,
}

/// A named binary resource referenced from the project.
///
/// An asset whose `base64` payload is present is self-contained and can be
/// persisted anywhere without a network fetch. An asset without a payload
/// only exists in the storage of the project it originated from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AssetFile {
    /// Inline payload as a data URL (`data:<mime>;base64,<data>`).
    pub base64: Option<String>,
}

impl AssetFile {
    /// An asset carrying its payload inline.
    pub fn with_payload(base64: impl Into<String>) -> Self {
        Self {
            base64: Some(base64.into()),
        }
    }

    /// An asset whose payload lives in its project's storage.
    pub const fn without_payload() -> Self {
        Self { base64: None }
    }

    /// Whether the payload is embedded.
    pub const fn has_payload(&self) -> bool {
        self.base64.is_some()
    }

    /// MIME type declared by the data URL payload, if any.
    pub fn mime_type(&self) -> Option<&str> {
        self.base64.as_deref().and_then(|payload| split_data_url(payload).map(|(mime, _)| mime))
    }
}

/// An asset entry paired with its path in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AssetWithFileName {
    /// Path of the asset inside the project contents.
    pub file_name: String,
    /// The asset itself.
    pub file: AssetFile,
}

/// Split a `data:<mime>;base64,<data>` URL into its MIME type and body.
///
/// Returns `None` when the string is not a base64 data URL.
pub fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, body) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, body))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text(code: &str) -> ProjectFile {
        ProjectFile::TextFile(TextFile {
            code: code.to_owned(),
            last_revised_time: 0,
        })
    }

    #[test]
    fn with_file_leaves_original_untouched() {
        let base = PersistentModel::new(1).with_file("/app.js", text("a"));
        let next = base.with_file("/app.js", text("b"));

        assert_eq!(base.file("/app.js"), Some(&text("a")));
        assert_eq!(next.file("/app.js"), Some(&text("b")));
        assert_ne!(base, next);
    }

    #[test]
    fn asset_entries_follow_path_order() {
        let model = PersistentModel::new(1)
            .with_file("/z.png", ProjectFile::AssetFile(AssetFile::without_payload()))
            .with_file("/src", ProjectFile::Directory)
            .with_file(
                "/a.png",
                ProjectFile::AssetFile(AssetFile::with_payload("data:image/png;base64,AA==")),
            );

        let names: Vec<String> = model.asset_entries().into_iter().map(|a| a.file_name).collect();
        assert_eq!(names, vec!["/a.png".to_owned(), "/z.png".to_owned()]);
        assert!(!model.assets_self_contained());
    }

    #[test]
    fn project_file_uses_type_tag() {
        let json =
            serde_json::to_value(ProjectFile::AssetFile(AssetFile::without_payload())).unwrap();
        assert_eq!(json["type"], "ASSET_FILE");
        assert!(json["base64"].is_null());

        let dir = serde_json::to_value(ProjectFile::Directory).unwrap();
        assert_eq!(dir["type"], "DIRECTORY");
    }

    #[test]
    fn data_url_parsing() {
        assert_eq!(
            split_data_url("data:asset/xyz;base64,SomeBase64"),
            Some(("asset/xyz", "SomeBase64"))
        );
        assert_eq!(split_data_url("SomeBase64"), None);
        assert_eq!(split_data_url("data:text/plain,hello"), None);

        let asset = AssetFile::with_payload("data:image/png;base64,AA==");
        assert_eq!(asset.mime_type(), Some("image/png"));
    }
}
