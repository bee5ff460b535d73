//! Error types for tunelift-up

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::flow::FlowError;
use crate::services::{GatewayError, UploadError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., a flow already exists for the session
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An upstream dependency (storage or gateway) failed (502)
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// tunelift-common error
    #[error("Common error: {0}")]
    Common(#[from] tunelift_common::Error),
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Validation { .. } | FlowError::CapacityExceeded { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            FlowError::UnknownTrack(_) => ApiError::NotFound(err.to_string()),
            FlowError::Upload(upload) => match upload {
                UploadError::FileTooLarge { .. } | UploadError::UnsupportedFileType(_) => {
                    ApiError::BadRequest(upload.to_string())
                }
                UploadError::Network(_) | UploadError::ServerRejected { .. } => {
                    ApiError::Upstream(upload.to_string())
                }
            },
            FlowError::Gateway(gateway) => match gateway {
                GatewayError::Network(_) | GatewayError::Malformed(_) => {
                    ApiError::Upstream(gateway.to_string())
                }
                // Authoritative rejection: correctable by the caller
                GatewayError::Rejected { .. } => ApiError::BadRequest(gateway.to_string()),
            },
            FlowError::Storage(common) => ApiError::Common(common),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
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

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
