//! Asset synchronization for project forks.
//!
//! A forked project gets a new id, but its assets may still live only in
//! the source project's storage (entries without an inline payload). Before
//! the fork can be stored anywhere, those payloads are downloaded from the
//! source and embedded so the new model is self-contained.

use keel_store::StoreError;
use keel_types::{AssetWithFileName, PersistentModel, ProjectFile, ProjectId};

use crate::backend::PersistenceBackend;
use crate::error::PersistenceError;

/// The outcome of [`sync_fork_assets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkedModel {
    /// The model with every asset payload embedded.
    pub model: PersistentModel,
    /// Assets whose payload was filled in, in path order.
    pub downloaded: Vec<AssetWithFileName>,
}

/// Embed every missing asset payload from `source`'s storage.
///
/// Only assets lacking a payload are requested, and nothing is requested
/// when there are none. Non-asset content is left untouched.
///
/// # Errors
///
/// Returns [`PersistenceError`] if the download fails or the source has no
/// payload for a requested asset.
pub async fn sync_fork_assets(
    source: &ProjectId,
    model: &PersistentModel,
    downloader: &dyn PersistenceBackend,
) -> Result<ForkedModel, PersistenceError> {
    let missing: Vec<AssetWithFileName> = model
        .asset_entries()
        .into_iter()
        .filter(|a| !a.file.has_payload())
        .collect();
    if missing.is_empty() {
        return Ok(ForkedModel {
            model: model.clone(),
            downloaded: Vec::new(),
        });
    }

    let fetched = downloader.download_assets(source, &missing).await?;

    let mut updated = model.clone();
    let mut downloaded = Vec::with_capacity(missing.len());
    for request in &missing {
        let asset = fetched
            .iter()
            .find(|a| a.file_name == request.file_name && a.file.has_payload())
            .ok_or_else(|| StoreError::AssetNotFound {
                project_id: source.clone(),
                file_name: request.file_name.clone(),
            })?;
        updated = updated.with_file(
            asset.file_name.clone(),
            ProjectFile::AssetFile(asset.file.clone()),
        );
        downloaded.push(asset.clone());
    }

    tracing::debug!(
        source = %source,
        count = downloaded.len(),
        "Embedded forked asset payloads"
    );
    Ok(ForkedModel {
        model: updated,
        downloaded,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use keel_store::MemoryRemoteStore;
    use keel_types::{AssetFile, TextFile};

    use super::*;
    use crate::backend::RemoteBackend;

    const PAYLOAD: &str = "data:image/png;base64,iVBORw==";

    fn model() -> PersistentModel {
        PersistentModel::new(1)
            .with_file(
                "/app.js",
                ProjectFile::TextFile(TextFile {
                    code: "export {}".to_owned(),
                    last_revised_time: 7,
                }),
            )
            .with_file("/b.png", ProjectFile::AssetFile(AssetFile::without_payload()))
            .with_file("/a.png", ProjectFile::AssetFile(AssetFile::with_payload(PAYLOAD)))
    }

    #[tokio::test]
    async fn embeds_missing_payloads_only() {
        let store = MemoryRemoteStore::new("alice");
        let source = ProjectId::new("source");
        store.seed_asset(&source, "/b.png", PAYLOAD).await;
        let backend = RemoteBackend::new(Arc::new(store.clone()));

        let forked = sync_fork_assets(&source, &model(), &backend).await.unwrap();

        assert!(forked.model.assets_self_contained());
        assert_eq!(forked.model.file("/app.js"), model().file("/app.js"));
        let names: Vec<&str> = forked.downloaded.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["/b.png"]);

        let downloads = store.downloads().await;
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads.first().unwrap().file_names, vec!["/b.png".to_owned()]);
    }

    #[tokio::test]
    async fn complete_models_need_no_download() {
        let store = MemoryRemoteStore::new("alice");
        let backend = RemoteBackend::new(Arc::new(store.clone()));
        let complete = PersistentModel::new(1)
            .with_file("/a.png", ProjectFile::AssetFile(AssetFile::with_payload(PAYLOAD)));

        let forked = sync_fork_assets(&ProjectId::new("s"), &complete, &backend).await.unwrap();

        assert_eq!(forked.model, complete);
        assert!(forked.downloaded.is_empty());
        assert!(store.downloads().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_asset_fails() {
        let store = MemoryRemoteStore::new("alice");
        let backend = RemoteBackend::new(Arc::new(store));

        let result = sync_fork_assets(&ProjectId::new("s"), &model(), &backend).await;
        assert!(matches!(
            result,
            Err(PersistenceError::Store(StoreError::AssetNotFound { ref file_name, .. }))
                if file_name == "/b.png"
        ));
    }
}
