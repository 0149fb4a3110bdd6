//! API error taxonomy.
//!
//! Every failure surfaces to the client as `{ "message": "..." }` with a
//! conventional status code: 400 for validation and queue-rule rejections
//! (duplicates included), 401 for missing/bad credentials, 404 for missing
//! resources, 500 for storage failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::db::{QueueError, StoreError, UserRepoError};

/// API errors that can be returned to clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error("Not authorized for this resource")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Database(_) | QueueError::Pool(_) => {
                tracing::error!("queue storage error: {err}");
                ApiError::Internal
            }
            QueueError::PostNotFound | QueueError::NotQueued | QueueError::PlaylistNotFound => {
                ApiError::NotFound(err.to_string())
            }
            QueueError::NotPlayable
            | QueueError::Duplicate
            | QueueError::QueueFull
            | QueueError::InvalidIndex { .. }
            | QueueError::EmptyPlaylist
            | QueueError::AllDuplicates => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(_) | StoreError::Pool(_) => {
                tracing::error!("storage error: {err}");
                ApiError::Internal
            }
            StoreError::NotFound(what) => ApiError::NotFound(format!("Not found: {what}")),
            StoreError::AlreadyExists(what) => {
                ApiError::Validation(format!("Already exists: {what}"))
            }
        }
    }
}

impl From<UserRepoError> for ApiError {
    fn from(err: UserRepoError) -> Self {
        match err {
            UserRepoError::Database(_) | UserRepoError::Pool(_) => {
                tracing::error!("user storage error: {err}");
                ApiError::Internal
            }
            UserRepoError::NotFound(who) => ApiError::NotFound(format!("User not found: {who}")),
            UserRepoError::UsernameExists(who) => {
                ApiError::Validation(format!("Username already exists: {who}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_maps_to_bad_request() {
        let err = ApiError::from(QueueError::Duplicate);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_post_maps_to_not_found() {
        let err = ApiError::from(QueueError::PostNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_failure_is_opaque() {
        let err = ApiError::from(QueueError::Database(
            diesel::result::Error::RollbackTransaction,
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }
}
