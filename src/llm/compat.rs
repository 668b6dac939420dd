//! Compatibility rules for chat-completions backends
//!
//! Different servers reject different request knobs. Each failed attempt is
//! classified into a [`CompatAction`] that either adjusts the request and
//! retries, or gives up.

use crate::http::HttpError;
use crate::llm::types::ChatCompletionRequest;
use std::time::Duration;

/// Maximum number of POST attempts per chat request
pub const MAX_ATTEMPTS: u32 = 6;

const MIN_TIMEOUT_SECS: u64 = 35;
const MAX_TIMEOUT_SECS: u64 = 300;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatAction {
    /// Retry with a longer deadline
    ExtendTimeout,
    /// Move `max_tokens` to `max_completion_tokens`
    RenameMaxTokens,
    /// Drop `temperature` (model only accepts the default)
    DropTemperature,
    /// Drop `top_p` (model only accepts the default)
    DropTopP,
    /// Model only speaks the Responses API
    ResponsesApiRequired,
    /// Unknown failure
    GiveUp,
}

/// Deadline for the first attempt: 20 s plus 40 ms per requested token, clamped to 35..=300 s
pub fn initial_timeout(max_out: u32) -> Duration {
    let secs = 20 + (f64::from(max_out) * 0.04) as u64;
    Duration::from_secs(secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
}

/// Next deadline after a timeout: `1.6 * t + 5`, capped at 300 s
pub fn backoff(current: Duration) -> Duration {
    let secs = (current.as_secs() as f64 * 1.6) as u64 + 5;
    Duration::from_secs(secs.min(MAX_TIMEOUT_SECS))
}

/// Decide how to react to `err` given the request that produced it
pub fn classify(err: &HttpError, request: &ChatCompletionRequest) -> CompatAction {
    if err.is_timeout_like() {
        return CompatAction::ExtendTimeout;
    }

    let text = err.to_string();

    if text.contains("Unsupported parameter")
        && text.contains("'max_tokens'")
        && request.max_tokens.is_some()
    {
        return CompatAction::RenameMaxTokens;
    }

    if (text.contains(r#""param": "temperature""#)
        || text.contains("Unsupported value: 'temperature'"))
        && request.temperature.is_some()
    {
        return CompatAction::DropTemperature;
    }

    if (text.contains(r#""param": "top_p""#) || text.contains("Unsupported value: 'top_p'"))
        && request.top_p.is_some()
    {
        return CompatAction::DropTopP;
    }

    let lowered = text.to_lowercase();
    if lowered.contains("responses") || lowered.contains("max_output_tokens") {
        return CompatAction::ResponsesApiRequired;
    }

    CompatAction::GiveUp
}

/// Apply a request-shaping action in place
pub fn apply(action: CompatAction, request: &mut ChatCompletionRequest) {
    match action {
        CompatAction::RenameMaxTokens => {
            request.max_completion_tokens = request.max_tokens.take();
        }
        CompatAction::DropTemperature => request.temperature = None,
        CompatAction::DropTopP => request.top_p = None,
        CompatAction::ExtendTimeout
        | CompatAction::ResponsesApiRequired
        | CompatAction::GiveUp => {}
    }
}
