//! Error types for the Trellis server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServerError::ConfigError(_) | ServerError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

impl From<trellis_core::CoreError> for ServerError {
    fn from(err: trellis_core::CoreError) -> Self {
        ServerError::ValidationError(err.to_string())
    }
}

impl From<trellis_engine::EngineError> for ServerError {
    fn from(err: trellis_engine::EngineError) -> Self {
        ServerError::InternalError(err.to_string())
    }
}
