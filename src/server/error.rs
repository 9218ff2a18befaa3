//! API error type and response mapping.
//!
//! Every error leaves the server as `{"detail": <message>}`: client-error
//! statuses for validation failures, server-error for unrecovered
//! processing failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::pdf::ProcessError;

/// Errors surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request rejected before any extraction (wrong type, bad field).
    #[error("{0}")]
    BadRequest(String),

    /// Upload exceeds the configured ceiling.
    #[error("File too large. Maximum size is {0}MB")]
    PayloadTooLarge(u64),

    /// Extraction could not be recovered at the page level.
    #[error("Error processing PDF: {0}")]
    Processing(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, detail = %self, "request failed");
        } else {
            tracing::debug!(status = %status, detail = %self, "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        match err {
            // An empty document is a property of the upload, not a server
            // fault.
            ProcessError::EmptyDocument => ApiError::BadRequest(err.to_string()),
            other => ApiError::Processing(other.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(format!("invalid multipart upload: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Processing(format!("upload handling failed: {}", err))
    }
}
