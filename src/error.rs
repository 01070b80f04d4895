//! Error types for the guestbook service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == App Error Enum ==
/// Unified error type for the guestbook service.
///
/// A cache miss is never represented here: lookups return `Option` and the
/// caller falls back to the store.
#[derive(Error, Debug)]
pub enum AppError {
    /// Rejected configuration, fatal at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Guestbook or message not found
    #[error("{0}")]
    NotFound(String),

    /// Missing identity, wrong challenge answer, or foreign guestbook
    #[error("{0}")]
    Unauthorized(String),

    /// Request origin is not on the guestbook's allow list
    #[error("{0}")]
    Forbidden(String),

    /// Invalid request data
    #[error("{0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidConfig(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the guestbook service.
pub type Result<T> = std::result::Result<T, AppError>;
