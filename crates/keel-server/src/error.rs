//! Error types for the project service API.
//!
//! [`ApiError`] covers every way a request can be refused and converts into
//! an Axum HTTP response via its [`IntoResponse`] implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keel_types::ProjectId;

/// Errors that can occur in the project service API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request did not identify its user.
    #[error("missing user header")]
    MissingUser,

    /// The project belongs to another user.
    #[error("project {0} is owned by another user")]
    NotOwner(ProjectId),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A save of an unknown project did not carry any content.
    #[error("project {0} has no stored content to keep")]
    MissingContent(ProjectId),

    /// An asset payload was not a valid base64 data URL.
    #[error("invalid asset payload: {0}")]
    InvalidPayload(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingUser => StatusCode::UNAUTHORIZED,
            Self::NotOwner(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MissingContent(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
