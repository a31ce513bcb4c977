//! Error types for Swasya tools
//!
//! Provides:
//! - Distinct error types for store, index, embedding and generative failures
//! - HTTP status code mapping for the gateway
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Store errors (7xxx)
    StoreUnavailable,

    // Index errors (4xxx)
    IndexUnreadable,
    IndexWriteFailed,

    // External service errors (8xxx)
    EmbeddingError,
    LlmError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::IndexUnreadable => 4001,
            ErrorCode::IndexWriteFailed => 4002,

            ErrorCode::StoreUnavailable => 7002,

            ErrorCode::EmbeddingError => 8002,
            ErrorCode::LlmError => 8003,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Store errors
    #[error("Consultation store unavailable: {message}")]
    StoreUnavailable { message: String },

    // Index errors
    #[error("Index at {path} is unreadable: {message}")]
    IndexUnreadable { path: String, message: String },

    #[error("Failed to persist index to {path}: {message}")]
    IndexWrite { path: String, message: String },

    // External service errors
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Generative backend error: {message}")]
    LlmError { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            AppError::IndexUnreadable { .. } => ErrorCode::IndexUnreadable,
            AppError::IndexWrite { .. } => ErrorCode::IndexWriteFailed,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::LlmError { .. } => ErrorCode::LlmError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            AppError::IndexUnreadable { .. } |
            AppError::IndexWrite { .. } |
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::EmbeddingError { .. } |
            AppError::LlmError { .. } => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Whether load-or-build may recover from this error by rebuilding
    pub fn is_recoverable_index_error(&self) -> bool {
        matches!(self, AppError::IndexUnreadable { .. })
    }

    pub(crate) fn index_unreadable(path: &std::path::Path, message: impl Into<String>) -> Self {
        AppError::IndexUnreadable {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn index_write(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        AppError::IndexWrite {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: ErrorCode,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            success: false,
            error: message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string()
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::StoreUnavailable {
            message: err.to_string()
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string()
        }
    }
}
