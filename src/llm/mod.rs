//! LLM module
//!
//! OpenAI-compatible chat-completions client, its wire types and the
//! compatibility rules used to retry rejected requests.

pub mod client;
pub mod compat;
pub mod types;

pub use client::{LlmClient, LlmSettings};
pub use types::{ChatMessage, ChatRole};

use crate::http::HttpError;
use thiserror::Error;

/// Errors raised while talking to a chat-completions backend
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport or status failure
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Configured model is not listed by the server
    #[error(
        "Model '{model}' not found in your account. Pick a Chat Completions model (e.g. 'gpt-4o' or 'gpt-4.1').\nAvailable (sample): {available}"
    )]
    ModelNotFound {
        /// Requested model
        model: String,
        /// Up to six advertised ids
        available: String,
    },

    /// Backend only supports the Responses API
    #[error("This model expects the /v1/responses API (use max_output_tokens).")]
    ResponsesApiRequired,

    /// Response carried an `error` object
    #[error("LLM returned an error: {0}")]
    Api(String),

    /// Response did not have the chat-completions shape
    #[error("Unexpected LLM response: {0}")]
    UnexpectedResponse(String),

    /// Model produced no text
    #[error("Model returned empty message")]
    EmptyResponse,

    /// Required connection setting is missing
    #[error("LLM is not configured: {0}")]
    MissingConfig(String),
}

impl LlmError {
    /// True when the final failure was a deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Http(HttpError::Timeout { .. }))
    }
}
