//! Store implementations driven through their trait objects.
//!
//! The persistence engine only ever sees `Arc<dyn LocalStore>` and
//! `Arc<dyn RemoteStore>`, so these tests use the stores the same way.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use keel_store::{
    FileLocalStore, LocalStore, MemoryLocalStore, MemoryRemoteStore, RemoteStore, StoreError,
};
use keel_types::{
    AssetFile, AssetToSave, AssetWithFileName, LoadProjectResponse, LocalProjectRecord,
    PersistentModel, ProjectFile, ProjectId, local_project_key, project_id_from_local_key,
};

async fn exercise_local(store: Arc<dyn LocalStore>) {
    let id = ProjectId::new("abc123");
    let key = local_project_key(&id);
    let first = LocalProjectRecord::for_save(None, PersistentModel::new(1), "First", Utc::now());
    store.set(&key, &first).await.unwrap();

    let second = LocalProjectRecord::for_save(
        Some(&first),
        PersistentModel::new(2),
        "Second",
        Utc::now(),
    );
    store.set(&key, &second).await.unwrap();

    let loaded = store.get(&key).await.unwrap().unwrap();
    assert_eq!(loaded.model, PersistentModel::new(2));
    assert_eq!(loaded.created_at, first.created_at);

    let ids: Vec<ProjectId> = store
        .keys()
        .await
        .unwrap()
        .iter()
        .filter_map(|k| project_id_from_local_key(k))
        .collect();
    assert_eq!(ids, vec![id]);

    store.remove(&key).await.unwrap();
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn memory_local_store_contract() {
    exercise_local(Arc::new(MemoryLocalStore::new())).await;
}

#[tokio::test]
async fn file_local_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileLocalStore::open(dir.path().join("projects")).await.unwrap();
    exercise_local(Arc::new(store)).await;
}

#[tokio::test]
async fn remote_assets_are_scoped_to_their_project() {
    let store = MemoryRemoteStore::new("alice");
    let remote: Arc<dyn RemoteStore> = Arc::new(store.clone());

    let source = remote.create_project_id().await.unwrap();
    let model = PersistentModel::new(1).with_file(
        "/logo.png",
        ProjectFile::AssetFile(AssetFile::without_payload()),
    );
    remote.save_project(&source, Some(&model), Some("Source")).await.unwrap();
    remote
        .save_assets(
            &source,
            &[AssetToSave {
                file_type: "image/png".to_owned(),
                base64: "data:image/png;base64,iVBORw==".to_owned(),
                file_name: "/logo.png".to_owned(),
            }],
        )
        .await
        .unwrap();

    let request = model.asset_entries();
    let from_source = remote.download_assets(&source, &request).await.unwrap();
    assert_eq!(
        from_source,
        vec![AssetWithFileName {
            file_name: "/logo.png".to_owned(),
            file: AssetFile::with_payload("data:image/png;base64,iVBORw=="),
        }]
    );

    let other = remote.create_project_id().await.unwrap();
    let from_other = remote.download_assets(&other, &request).await.unwrap();
    assert_eq!(from_other, request);

    assert!(matches!(
        remote.load_project(&other).await.unwrap(),
        LoadProjectResponse::ProjectNotFound
    ));
    assert_eq!(store.uploads().await.len(), 1);
    assert_eq!(store.downloads().await.len(), 2);
}

#[tokio::test]
async fn uploads_to_foreign_projects_are_refused() {
    let alice = MemoryRemoteStore::new("alice");
    let bob: Arc<dyn RemoteStore> = Arc::new(alice.as_user("bob"));
    let id = ProjectId::new("shared");
    alice
        .insert_project(id.clone(), "alice", "Alice's", PersistentModel::new(1))
        .await;

    let result = bob.save_assets(&id, &[]).await;
    assert!(matches!(result, Err(StoreError::NotOwner(ref p)) if *p == id));
    assert!(alice.uploads().await.is_empty());
}
