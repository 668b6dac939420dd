//! Chat-completions client
//!
//! Direct HTTP client for OpenAI-compatible servers (OpenAI, LM Studio,
//! llama.cpp, vLLM...). Requests go through the compat shim so that a
//! backend rejecting a knob gets a reshaped retry instead of a hard failure.

use crate::http::{HttpClient, HttpError};
use crate::llm::compat::{self, CompatAction, MAX_ATTEMPTS};
use crate::llm::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ModelList};
use crate::llm::LlmError;
use serde_json::Value;
use std::time::Duration;

/// Default `top_p` sent with every request (may be pruned by the compat shim)
pub const DEFAULT_TOP_P: f64 = 0.9;

const DEBUG_TEXT_LIMIT: usize = 1500;
const MODEL_SAMPLE_SIZE: usize = 6;

/// Connection settings for one chat request
#[derive(Debug, Clone, Copy)]
pub struct LlmSettings<'a> {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: &'a str,
    /// Model identifier
    pub model: &'a str,
    /// API key (empty = no auth header)
    pub api_key: &'a str,
    /// Completion token cap
    pub max_output: u32,
}

impl LlmSettings<'_> {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn bearer(&self) -> Option<&str> {
        Some(self.api_key).filter(|k| !k.is_empty())
    }
}

/// Client for `/chat/completions` and `/models`
#[derive(Clone)]
pub struct LlmClient {
    http: HttpClient,
    models_timeout: Duration,
}

impl LlmClient {
    /// Create a client sharing the given transport
    pub fn new(http: HttpClient, models_timeout: Duration) -> Self {
        Self {
            http,
            models_timeout,
        }
    }

    /// Run one chat completion and return the assistant text
    ///
    /// # Arguments
    /// * `settings` - Endpoint, model, key and output cap
    /// * `messages` - Conversation to complete
    /// * `temperature` - Sampling temperature (pruned if the model rejects it)
    ///
    /// # Errors
    /// * `LlmError::Http` - Transport failure after the compat shim gave up
    /// * `LlmError::Api` - Server answered with an `error` object
    /// * `LlmError::UnexpectedResponse` - No `choices[0].message.content`
    /// * `LlmError::EmptyResponse` - Content is blank
    pub async fn chat(
        &self,
        settings: &LlmSettings<'_>,
        messages: &[ChatMessage],
        temperature: f64,
    ) -> Result<String, LlmError> {
        if settings.base().is_empty() {
            return Err(LlmError::MissingConfig("LLM base URL is empty".to_string()));
        }
        let model = settings.model.trim();
        if model.is_empty() {
            return Err(LlmError::MissingConfig("LLM model is empty".to_string()));
        }

        let url = format!("{}/chat/completions", settings.base());
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: Some(temperature),
            top_p: Some(DEFAULT_TOP_P),
            max_tokens: None,
            max_completion_tokens: None,
        };

        tracing::debug!(
            url = %url,
            model = %request.model,
            n_messages = request.messages.len(),
            has_key = settings.bearer().is_some(),
            max_out = settings.max_output,
            "Chat request"
        );

        let response = self
            .post_chat_with_compat(&url, settings.bearer(), request, settings.max_output)
            .await?;
        extract_content(&response)
    }

    /// POST to `/chat/completions`, adapting the request on known rejections
    ///
    /// Starts with `max_tokens = max_out` and a deadline derived from it. On
    /// failure the error is classified: timeouts extend the deadline, knob
    /// rejections reshape the payload, anything else ends the loop.
    pub async fn post_chat_with_compat(
        &self,
        url: &str,
        bearer: Option<&str>,
        mut request: ChatCompletionRequest,
        max_out: u32,
    ) -> Result<Value, LlmError> {
        request.max_tokens = Some(max_out);
        request.max_completion_tokens = None;
        let mut timeout = compat::initial_timeout(max_out);
        let mut last_err: Option<HttpError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.http.post_json(url, &request, bearer, timeout).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let action = compat::classify(&err, &request);
                    tracing::debug!(
                        attempt = attempt,
                        action = ?action,
                        error = %err,
                        "Chat attempt failed"
                    );
                    match action {
                        CompatAction::ExtendTimeout => {
                            timeout = compat::backoff(timeout);
                        }
                        CompatAction::ResponsesApiRequired => {
                            return Err(LlmError::ResponsesApiRequired);
                        }
                        CompatAction::GiveUp => return Err(LlmError::Http(err)),
                        reshape => compat::apply(reshape, &mut request),
                    }
                    last_err = Some(err);
                }
            }
        }

        tracing::warn!(url = %url, attempts = MAX_ATTEMPTS, "Chat request exhausted retries");
        Err(last_err
            .map(LlmError::Http)
            .unwrap_or(LlmError::EmptyResponse))
    }

    /// List models advertised by `{base}/models`
    pub async fn list_models(&self, base_url: &str, api_key: &str) -> Result<ModelList, LlmError> {
        let url = format!("{}/models", base_url.trim_end_matches('/'));
        let bearer = Some(api_key).filter(|k| !k.is_empty());
        let value = self.http.get_json(&url, bearer, self.models_timeout).await?;
        Ok(ModelList::from_value(&value))
    }

    /// Fail when the configured model is not offered by the server
    ///
    /// Only runs when both base URL and key are set; hosted APIs are the
    /// ones where a typo in the model name is common.
    pub async fn assert_model_exists(&self, settings: &LlmSettings<'_>) -> Result<(), LlmError> {
        if settings.base().is_empty() || settings.api_key.is_empty() {
            return Ok(());
        }
        let models = self.list_models(settings.base_url, settings.api_key).await?;
        let wanted = settings.model.trim();
        let ids: Vec<&str> = models.data.iter().map(|m| m.identifier()).collect();
        if wanted.is_empty() || ids.contains(&wanted) {
            return Ok(());
        }

        let mut sample = ids
            .iter()
            .take(MODEL_SAMPLE_SIZE)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        if ids.len() > MODEL_SAMPLE_SIZE {
            sample.push('…');
        }
        Err(LlmError::ModelNotFound {
            model: wanted.to_string(),
            available: sample,
        })
    }

    /// Look up the context window the server advertises for the model
    ///
    /// # Returns
    /// * `Ok(Some(n))` - A positive context length was found
    /// * `Ok(None)` - Model missing or no size advertised
    pub async fn detect_context_length(
        &self,
        settings: &LlmSettings<'_>,
    ) -> Result<Option<u32>, LlmError> {
        if settings.base().is_empty() || settings.model.is_empty() {
            return Ok(None);
        }
        let models = self.list_models(settings.base_url, settings.api_key).await?;
        Ok(models
            .data
            .iter()
            .find(|m| m.identifier() == settings.model)
            .and_then(|m| m.context_window())
            .filter(|&n| n > 0)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX)))
    }
}

/// Pull `choices[0].message.content` out of a raw response
fn extract_content(response: &Value) -> Result<String, LlmError> {
    if response.get("error").is_some() {
        tracing::debug!(response = %short(response), "Raw response (error)");
        return Err(LlmError::Api(short(response)));
    }

    let parsed: ChatCompletionResponse = serde_json::from_value(response.clone())
        .map_err(|_| LlmError::UnexpectedResponse(short(response)))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::UnexpectedResponse(short(response)))?;

    tracing::debug!(content = %content, "Raw model content");

    if content.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(content)
}

/// Compact JSON rendering for logs and error messages
fn short(value: &Value) -> String {
    let s = value.to_string();
    if s.chars().count() <= DEBUG_TEXT_LIMIT {
        s
    } else {
        let cut: String = s.chars().take(DEBUG_TEXT_LIMIT).collect();
        format!("{} …(truncated)…", cut)
    }
}
