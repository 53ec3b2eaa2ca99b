//! Error handling for the Spice ERP backend
//!
//! Provides consistent JSON error responses and the store-level error type the
//! reconciliation engine reports per row.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors raised by a balance store implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),

    #[error("store write failed: {0}")]
    Write(String),

    /// Insert hit the storage-level uniqueness constraint
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl StoreError {
    pub fn read(err: impl std::fmt::Display) -> Self {
        StoreError::Read(err.to_string())
    }

    pub fn write(err: impl std::fmt::Display) -> Self {
        StoreError::Write(err.to_string())
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Store errors
    #[error("Store read failure: {0}")]
    StoreReadFailure(String),

    #[error("Store write failure: {0}")]
    StoreWriteFailure(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Machine-readable error code, also used for per-row failures
    pub fn code(&self) -> &'static str {
        match self {
            AppError::StoreReadFailure(_) => "STORE_READ_FAILURE",
            AppError::StoreWriteFailure(_) => "STORE_WRITE_FAILURE",
            AppError::Validation { .. } | AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
        }
    }

    /// Whether re-running the same action can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::StoreReadFailure(_) | AppError::StoreWriteFailure(_)
        )
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Read(msg) => AppError::StoreReadFailure(msg),
            StoreError::Write(msg) => AppError::StoreWriteFailure(msg),
            StoreError::UniqueViolation(msg) => AppError::StoreWriteFailure(msg),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, field) = match &self {
            AppError::StoreReadFailure(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Store read failed: {}", msg),
                None,
            ),
            AppError::StoreWriteFailure(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Store write failed: {}", msg),
                None,
            ),
            AppError::Validation { field, message } => {
                (StatusCode::BAD_REQUEST, message.clone(), Some(field.clone()))
            }
            AppError::ValidationError(errors) => {
                (StatusCode::BAD_REQUEST, errors.to_string(), None)
            }
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                format!("{} not found", resource),
                None,
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        let detail = ErrorDetail {
            code: self.code().to_string(),
            message,
            field,
        };

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
