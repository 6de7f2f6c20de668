//! API Error Responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use request_validator::ValidationError;
use serde_json::json;
use storage::StorageError;
use thiserror::Error;
use tracing::error;

/// Errors returned by handlers, rendered as `{ "error": message }`
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    BadRequest(String),
    /// Referenced record absent (404)
    #[error("{0}")]
    NotFound(String),
    /// Record changed underneath the request (409)
    #[error("{0}")]
    Conflict(String),
    /// Anything else (500); the detail is logged, never returned
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::NotFound("Record not found".to_string()),
            StorageError::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => msg,
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
