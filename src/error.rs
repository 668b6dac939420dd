//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Tab index does not refer to an existing session
    #[error("Tab not found: {0}")]
    TabNotFound(usize),

    /// Request payload is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The user sent a blank prompt
    #[error("Empty prompt")]
    EmptyPrompt,

    /// Missing or wrong bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Error occurred during session persistence
    #[error("Persistence error: {0}")]
    Persistence(#[from] crate::assistant::session::PersistenceError),

    /// Chat-completions backend failed
    #[error("LLM error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    /// Embedding provider failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] crate::rag::EmbedError),

    /// Vector index could not be loaded or queried
    #[error("Index error: {0}")]
    Index(#[from] crate::rag::IndexError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::TabNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::EmptyPrompt => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Llm(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AppError::Llm(_) => StatusCode::BAD_GATEWAY,
            AppError::Embedding(_) => StatusCode::BAD_GATEWAY,
            AppError::Index(crate::rag::IndexError::DimensionMismatch { .. }) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
