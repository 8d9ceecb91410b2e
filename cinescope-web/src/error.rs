//! Error types for cinescope-web

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::firebase::auth::FirebaseAuthError;
use crate::firebase::firestore::FirestoreError;
use crate::tmdb::TmdbError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Not signed in or session expired (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict (409) - e.g., account already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream service rejected or throttled the request (429)
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// Upstream service failure (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// cinescope-common error
    #[error("Common error: {0}")]
    Common(#[from] cinescope_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::TooManyRequests(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_REQUESTS", msg)
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("Database error: {}", err))
    }
}

impl From<TmdbError> for ApiError {
    fn from(err: TmdbError) -> Self {
        match err {
            TmdbError::MovieNotFound(id) => ApiError::NotFound(format!("Movie {} not found", id)),
            TmdbError::InvalidApiKey => {
                ApiError::Upstream("Movie catalog rejected the configured API key".to_string())
            }
            TmdbError::RateLimited => {
                ApiError::TooManyRequests("Movie catalog rate limit exceeded".to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<FirebaseAuthError> for ApiError {
    fn from(err: FirebaseAuthError) -> Self {
        match err {
            FirebaseAuthError::EmailExists => {
                ApiError::Conflict("An account with this email already exists".to_string())
            }
            FirebaseAuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid email or password".to_string())
            }
            FirebaseAuthError::WeakPassword(msg) => ApiError::BadRequest(msg),
            FirebaseAuthError::UserDisabled => {
                ApiError::Unauthorized("This account has been disabled".to_string())
            }
            FirebaseAuthError::TooManyAttempts => ApiError::TooManyRequests(
                "Too many attempts, please try again later".to_string(),
            ),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<FirestoreError> for ApiError {
    fn from(err: FirestoreError) -> Self {
        match err {
            FirestoreError::PermissionDenied => {
                ApiError::Unauthorized("Session is no longer valid".to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
