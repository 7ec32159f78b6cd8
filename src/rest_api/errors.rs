//! # REST API Errors
//!
//! Error types for the record API. Every failure ends here and is rendered
//! as `{"error": "<message>"}` with the matching status code.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Result type for REST operations
pub type ApiResult<T> = Result<T, ApiError>;

/// REST API errors
#[derive(Debug, Error)]
pub enum ApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Malformed or incomplete input
    #[error("{0}")]
    BadRequest(String),

    /// Id does not resolve to a record
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Mutation attempted while production-gated
    #[error("{0} is disabled in production")]
    Forbidden(String),

    /// Request body exceeds the accepted size
    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    /// Unsupported HTTP method
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Storage failure
    #[error("Internal error: {0}")]
    Internal(#[from] StoreError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn id_required() -> Self {
        Self::bad_request("Record id is required")
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::bad_request(rejection.body_text())
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            error!(error = %cause, "record operation failed");
        }
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
