//! Session service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients never carry internal details; the
//! underlying platform error is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Session service error type.
///
/// Maps to HTTP status codes:
/// - ExternalService, NoSessionAvailable, Internal: 500 Internal Server Error
/// - NotFound: 404 Not Found
/// - BadRequest: 400 Bad Request
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The media platform call failed or timed out. Never retried.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// The requested session does not exist or is not valid.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No session id was supplied and no default session exists.
    #[error("No video session available")]
    NoSessionAvailable,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl ServiceError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::ExternalService(_)
            | ServiceError::NoSessionAvailable
            | ServiceError::Internal => 500,
            ServiceError::NotFound(_) => 404,
            ServiceError::BadRequest(_) => 400,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ServiceError::ExternalService(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "session.platform", error = %err, "Media platform call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXTERNAL_SERVICE_ERROR",
                    "The media platform request failed".to_string(),
                )
            }
            ServiceError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            ServiceError::NoSessionAvailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NO_SESSION_AVAILABLE",
                "No video session available".to_string(),
            ),
            ServiceError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            ServiceError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<common::error::MeetroomError> for ServiceError {
    fn from(err: common::error::MeetroomError) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}
