//! REST endpoint handlers for the project service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness check |
//! | `POST` | `/v1/projects` | Allocate a project id |
//! | `PUT` | `/v1/projects/{id}` | Save a revision and/or name |
//! | `GET` | `/v1/projects/{id}` | Load the latest revision |
//! | `GET` | `/v1/projects/{id}/owner` | Ask whether the caller owns the project |
//! | `PUT` | `/v1/projects/{id}/assets` | Upload asset payloads |
//! | `POST` | `/v1/projects/{id}/assets/download` | Fill in stored asset payloads |
//!
//! Writes and ownership checks identify the caller by the
//! [`USER_HEADER`] header.

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use keel_types::{
    AssetToSave, AssetWithFileName, CreateProjectResponse, LoadProjectResponse, OwnerId,
    OwnershipResponse, ProjectId, SaveProjectRequest, SaveProjectResponse, USER_HEADER,
};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// The user a request was made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub OwnerId);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(|user| Self(OwnerId::new(user)))
            .ok_or(ApiError::MissingUser)
    }
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report that the service is up.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Allocate a fresh project id.
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> Json<CreateProjectResponse> {
    let id = state.registry.write().await.allocate();
    debug!(project_id = %id, user = %user, "Allocated project id");
    Json(CreateProjectResponse { id })
}

/// Save a revision and/or a new name.
pub async fn save_project(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<ProjectId>,
    Json(body): Json<SaveProjectRequest>,
) -> Result<Json<SaveProjectResponse>, ApiError> {
    let result = state
        .registry
        .write()
        .await
        .save(&id, &user, body.name, body.content, Utc::now());
    match result {
        Ok(saved) => {
            debug!(project_id = %id, user = %user, "Saved project");
            Ok(Json(saved))
        }
        Err(e) => {
            warn!(project_id = %id, user = %user, error = %e, "Rejected project save");
            Err(e)
        }
    }
}

/// Load the latest revision.
///
/// Unknown ids answer 404 with a `ProjectNotFound` body.
pub async fn load_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ProjectId>,
) -> Response {
    match state.registry.read().await.load(&id) {
        Some(loaded) => Json(loaded).into_response(),
        None => (StatusCode::NOT_FOUND, Json(LoadProjectResponse::ProjectNotFound)).into_response(),
    }
}

/// Whether the caller may write to the project.
pub async fn check_ownership(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<ProjectId>,
) -> Json<OwnershipResponse> {
    let is_owner = state.registry.read().await.is_owner(&id, &user);
    Json(OwnershipResponse { is_owner })
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Store uploaded asset payloads.
pub async fn save_assets(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<ProjectId>,
    Json(uploads): Json<Vec<AssetToSave>>,
) -> Result<StatusCode, ApiError> {
    let count = state.registry.write().await.store_assets(&id, &user, &uploads)?;
    debug!(project_id = %id, count, "Stored project assets");
    Ok(StatusCode::NO_CONTENT)
}

/// Return the requested assets with their stored payloads filled in.
pub async fn download_assets(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ProjectId>,
    Json(requests): Json<Vec<AssetWithFileName>>,
) -> Json<Vec<AssetWithFileName>> {
    Json(state.registry.read().await.download_assets(&id, requests))
}

/// Answer unknown routes with a JSON 404.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_owned())
}
