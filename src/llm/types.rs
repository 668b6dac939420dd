//! Chat-completions wire types
//!
//! Structs that mirror the OpenAI-compatible `/chat/completions` and
//! `/models` JSON formats.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions for the model
    System,
    /// Message from the user
    User,
    /// Message from the assistant/AI
    Assistant,
}

impl ChatRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Parse a role accepted by chat-completions; other roles (e.g. `tool`) yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(ChatRole::System),
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

/// A single chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: ChatRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for `/chat/completions`
///
/// Optional knobs are omitted from the JSON when unset so the compat shim
/// can strip them one by one.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatCompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation to complete
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Legacy completion token cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Completion token cap for newer models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
}

/// Top-level chat-completions response
#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponse {
    /// Candidate completions
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One completion candidate
#[derive(Deserialize, Debug)]
pub struct Choice {
    /// Generated message
    pub message: ChoiceMessage,
}

/// Message inside a completion candidate
#[derive(Deserialize, Debug)]
pub struct ChoiceMessage {
    /// Generated text; some backends send `null` for tool calls
    #[serde(default)]
    pub content: Option<String>,
}

/// `/models` listing
#[derive(Debug, Default, Clone)]
pub struct ModelList {
    /// Available models
    pub data: Vec<ModelInfo>,
}

impl ModelList {
    /// Decode a listing field by field
    ///
    /// A missing or `null` `data` is an empty list and entries that are not
    /// objects are skipped, so one odd entry cannot hide the others.
    pub fn from_value(value: &Value) -> Self {
        let data = value
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(ModelInfo::from_value).collect())
            .unwrap_or_default();
        Self { data }
    }
}

/// A model entry; servers disagree on which fields they fill
#[derive(Debug, Default, Clone)]
pub struct ModelInfo {
    /// OpenAI-style identifier
    pub id: Option<String>,
    /// Alternative identifier used by some local servers
    pub name: Option<String>,
    /// Context window (OpenRouter, LM Studio)
    pub context_length: Option<u64>,
    /// Context window (vLLM)
    pub max_context_length: Option<u64>,
    /// Context window (llama.cpp)
    pub n_ctx: Option<u64>,
    /// Context window (HF-style configs)
    pub max_position_embeddings: Option<u64>,
}

impl ModelInfo {
    /// Decode one entry; `None` when it is not a JSON object
    ///
    /// Context sizes count only when they are positive integers.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let size = |key: &str| obj.get(key).and_then(Value::as_u64).filter(|&n| n > 0);
        Some(Self {
            id: text("id"),
            name: text("name"),
            context_length: size("context_length"),
            max_context_length: size("max_context_length"),
            n_ctx: size("n_ctx"),
            max_position_embeddings: size("max_position_embeddings"),
        })
    }

    /// Identifier of the model, preferring `id` over `name`
    pub fn identifier(&self) -> &str {
        self.id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.name.as_deref())
            .unwrap_or("")
    }

    /// First usable context window size, if any
    pub fn context_window(&self) -> Option<u64> {
        self.context_length
            .or(self.max_context_length)
            .or(self.n_ctx)
            .or(self.max_position_embeddings)
    }
}
