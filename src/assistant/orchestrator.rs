//! Ask pipeline
//!
//! Combines retrieval, prompt assembly, budget fitting, the LLM call and
//! answer clean-up for one question on one session.

use super::budget::{budget_for, fit_messages_to_budget};
use super::postprocess::{normalize_model_markdown, sanitize_output};
use super::prompts::{
    format_hint, needs_code, INSUFFICIENT_CONTEXT, PROMPT_CHAT, PROMPT_GROUNDED, PROMPT_HYBRID,
};
use super::retrieval::{RagClient, RetrievedContext};
use super::session::{Mode, Session};
use crate::error::AppError;
use crate::llm::{ChatMessage, LlmClient, LlmSettings};
use serde::Serialize;

/// History turns sent with each question
pub const HISTORY_TURNS: usize = 40;

/// Sampling temperature for answers
pub const ANSWER_TEMPERATURE: f64 = 0.2;

/// Result of one question
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskOutcome {
    /// Cleaned answer
    pub answer: String,
    /// Context text shown alongside the answer
    pub context: String,
    /// Results returned by the search service
    pub rag_chunks: usize,
    /// Best retrieval score
    pub top_score: Option<f64>,
}

/// Question answering service
#[derive(Clone)]
pub struct Assistant {
    llm: LlmClient,
    rag: RagClient,
}

fn llm_settings(session: &Session) -> LlmSettings<'_> {
    LlmSettings {
        base_url: &session.llm_base,
        model: &session.llm_model,
        api_key: &session.llm_key,
        max_output: session.max_output,
    }
}

/// Assemble the conversation for `mode`
///
/// Returns `None` when grounded mode must refuse without calling the model.
pub fn build_messages(
    mode: Mode,
    question: &str,
    code: bool,
    context: &RetrievedContext,
    history: &[ChatMessage],
) -> Option<Vec<ChatMessage>> {
    let has_context = context.has_context();
    let grounded_turn = || format!("QUESTION:\n{}\n\nCONTEXT:\n{}", question, context.text);

    let (preset, user_turn) = match mode {
        Mode::Grounded if !has_context && code => return None,
        Mode::Grounded | Mode::Auto if has_context => (PROMPT_GROUNDED, grounded_turn()),
        Mode::Grounded | Mode::Auto | Mode::Chat => (PROMPT_CHAT, question.to_string()),
        Mode::Hybrid => (
            PROMPT_HYBRID,
            format!(
                "QUESTION:\n{}\n\nCONTEXT (optional):\n{}",
                question, context.text
            ),
        ),
    };

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(format!("{}{}", preset, format_hint(code))));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(user_turn));
    Some(messages)
}

impl Assistant {
    /// Create the pipeline from its two clients
    pub fn new(llm: LlmClient, rag: RagClient) -> Self {
        Self { llm, rag }
    }

    /// Answer `prompt` using the settings and history of `session`
    ///
    /// The caller records the exchange; this method does not mutate state.
    pub async fn ask(&self, session: &Session, prompt: &str) -> Result<AskOutcome, AppError> {
        let question = prompt.trim();
        if question.is_empty() {
            return Err(AppError::EmptyPrompt);
        }

        let code = needs_code(question);
        let context = if session.use_rag && session.mode.uses_retrieval() {
            self.rag
                .retrieve(&session.rag_url, &session.rag_token, session.top_k, question)
                .await
        } else {
            RetrievedContext::default()
        };

        let start = session.history.len().saturating_sub(HISTORY_TURNS);
        let history = &session.history[start..];

        tracing::info!(
            session_id = %session.id,
            mode = ?session.mode,
            code = code,
            rag_chunks = context.chunks,
            "Answering question"
        );

        let raw = match build_messages(session.mode, question, code, &context, history) {
            None => INSUFFICIENT_CONTEXT.to_string(),
            Some(messages) => {
                let messages = fit_messages_to_budget(&messages, budget_for(session));
                let settings = llm_settings(session);
                if let Err(e) = self.llm.assert_model_exists(&settings).await {
                    tracing::debug!(error = %e, "Model check skipped");
                }
                self.llm
                    .chat(&settings, &messages, ANSWER_TEMPERATURE)
                    .await?
                    .trim()
                    .to_string()
            }
        };

        let answer = sanitize_output(&normalize_model_markdown(&raw));
        Ok(AskOutcome {
            answer,
            context: context.text,
            rag_chunks: context.chunks,
            top_score: context.top_score,
        })
    }

    /// Context window advertised for the session's model, if any
    ///
    /// Failures are logged and reported as `None`.
    pub async fn detect_context_length(&self, session: &Session) -> Option<u32> {
        match self.llm.detect_context_length(&llm_settings(session)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(error = %e, model = %session.llm_model, "Context detection failed");
                None
            }
        }
    }
}
