//! Chat API handlers
//!
//! Flow: question -> snapshot of the active session -> ask pipeline (no lock
//! held) -> exchange recorded on the session it was asked on.

use crate::assistant::AskOutcome;
use crate::error::AppError;
use crate::llm::ChatMessage;
use crate::state::SharedState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

/// Ask request
#[derive(Deserialize)]
pub struct AskRequest {
    /// User question
    #[serde(default)]
    pub prompt: String,
}

/// History response
#[derive(Serialize)]
pub struct HistoryResponse {
    /// Active tab history, oldest first
    pub history: Vec<ChatMessage>,
}

/// POST /api/ask - Answer a question on the active tab
pub async fn ask(
    State(state): State<SharedState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskOutcome>, AppError> {
    let session = state.current_session().await;
    let outcome = state.assistant.ask(&session, &request.prompt).await?;

    state.sessions.write().await.record_exchange(
        &session.id,
        request.prompt.trim(),
        &outcome.answer,
    )?;

    Ok(Json(outcome))
}

/// POST /api/chat/new - Clear the active tab's history
pub async fn new_chat(State(state): State<SharedState>) -> Result<Json<HistoryResponse>, AppError> {
    let mut store = state.sessions.write().await;
    store.new_chat()?;
    Ok(Json(HistoryResponse {
        history: store.current().history.clone(),
    }))
}

/// GET /api/history - Active tab history
pub async fn get_history(State(state): State<SharedState>) -> Json<HistoryResponse> {
    let store = state.sessions.read().await;
    Json(HistoryResponse {
        history: store.current().history.clone(),
    })
}
