//! HTTP client for the remote project service.
//!
//! Speaks the JSON contract served by `keel-server`:
//!
//! ```text
//! POST /v1/projects                      -> CreateProjectResponse
//! PUT  /v1/projects/{id}                 -> SaveProjectResponse   (403: not owner)
//! GET  /v1/projects/{id}                 -> LoadProjectResponse   (404: not found)
//! GET  /v1/projects/{id}/owner           -> OwnershipResponse
//! PUT  /v1/projects/{id}/assets          -> 204                   (403: not owner)
//! POST /v1/projects/{id}/assets/download -> [AssetWithFileName]
//! ```
//!
//! The calling user is identified by the [`USER_HEADER`] header. Request
//! timeouts are enforced by the underlying `reqwest` client.

use std::time::Duration;

use async_trait::async_trait;
use keel_types::{
    AssetToSave, AssetWithFileName, CreateProjectResponse, LoadProjectResponse, OwnershipResponse,
    PersistentModel, ProjectId, SaveProjectRequest, SaveProjectResponse, USER_HEADER,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};

use crate::error::StoreError;
use crate::remote::RemoteStore;

/// Remote store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
    user_token: Option<String>,
}

impl HttpRemoteStore {
    /// Create a client for the service at `base_url`.
    ///
    /// Requests carry `user_token` as the caller identity when present and
    /// give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        user_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            user_token,
        })
    }

    /// The service base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        match &self.user_token {
            Some(token) => builder.header(USER_HEADER, token),
            None => builder,
        }
    }
}

/// Turn a non-success response into a [`StoreError`].
///
/// A 403 on a project route always means another user owns the project.
async fn check_status(response: Response, id: Option<&ProjectId>) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if let (StatusCode::FORBIDDEN, Some(id)) = (status, id) {
        return Err(StoreError::NotOwner(id.clone()));
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_owned());
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn create_project_id(&self) -> Result<ProjectId, StoreError> {
        let response = self.request(Method::POST, "/v1/projects").send().await?;
        let body: CreateProjectResponse = check_status(response, None).await?.json().await?;
        tracing::debug!(project_id = %body.id, "Allocated remote project id");
        Ok(body.id)
    }

    async fn save_project(
        &self,
        id: &ProjectId,
        content: Option<&PersistentModel>,
        name: Option<&str>,
    ) -> Result<SaveProjectResponse, StoreError> {
        let body = SaveProjectRequest {
            name: name.map(ToOwned::to_owned),
            content: content.cloned(),
        };
        let response = self
            .request(Method::PUT, &format!("/v1/projects/{id}"))
            .json(&body)
            .send()
            .await?;
        Ok(check_status(response, Some(id)).await?.json().await?)
    }

    async fn load_project(&self, id: &ProjectId) -> Result<LoadProjectResponse, StoreError> {
        let response = self
            .request(Method::GET, &format!("/v1/projects/{id}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(LoadProjectResponse::ProjectNotFound);
        }
        Ok(check_status(response, Some(id)).await?.json().await?)
    }

    async fn check_ownership(&self, id: &ProjectId) -> Result<bool, StoreError> {
        let response = self
            .request(Method::GET, &format!("/v1/projects/{id}/owner"))
            .send()
            .await?;
        let body: OwnershipResponse = check_status(response, Some(id)).await?.json().await?;
        Ok(body.is_owner)
    }

    async fn save_assets(&self, id: &ProjectId, assets: &[AssetToSave]) -> Result<(), StoreError> {
        let response = self
            .request(Method::PUT, &format!("/v1/projects/{id}/assets"))
            .json(assets)
            .send()
            .await?;
        check_status(response, Some(id)).await?;
        tracing::debug!(project_id = %id, count = assets.len(), "Uploaded assets");
        Ok(())
    }

    async fn download_assets(
        &self,
        id: &ProjectId,
        assets: &[AssetWithFileName],
    ) -> Result<Vec<AssetWithFileName>, StoreError> {
        let response = self
            .request(Method::POST, &format!("/v1/projects/{id}/assets/download"))
            .json(assets)
            .send()
            .await?;
        Ok(check_status(response, Some(id)).await?.json().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let store =
            HttpRemoteStore::new("http://localhost:8080/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(store.base_url(), "http://localhost:8080");
    }
}
