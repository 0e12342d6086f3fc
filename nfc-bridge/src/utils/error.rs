//! Unified error handling
//!
//! - [`AppError`] - API error enum
//! - [`AppResponse`] - API response body
//!
//! # Error codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0000 | Success |
//! | E0002 | Validation failed |
//! | E0003 | Resource not found |
//! | E1001 | Tag write failed or timed out |
//! | E9001 | Internal error |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// API response body
///
/// ```json
/// {
///   "code": "0000",
///   "message": "success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// Error code (0000 on success)
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> AppResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: "0000".to_string(),
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad request body (400)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource not available (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Write not confirmed before the timeout (504)
    #[error("Tag write failed: {0}")]
    WriteFailed(String),

    /// Internal error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.as_str()),
            AppError::WriteFailed(msg) => (StatusCode::GATEWAY_TIMEOUT, "E1001", msg.as_str()),
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9001", "Internal error")
            }
        };

        let body = AppResponse::<()> {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Wrap data in a success response
pub fn ok<T: Serialize>(data: T) -> AppResult<Json<AppResponse<T>>> {
    Ok(Json(AppResponse::success(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::validation("spool must be non-zero"), StatusCode::BAD_REQUEST),
            (AppError::not_found("no simulated field"), StatusCode::NOT_FOUND),
            (AppError::WriteFailed("timeout".into()), StatusCode::GATEWAY_TIMEOUT),
            (AppError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_success_body() {
        let body = serde_json::to_value(AppResponse::success(42)).unwrap();
        assert_eq!(body["code"], "0000");
        assert_eq!(body["data"], 42);
    }
}
