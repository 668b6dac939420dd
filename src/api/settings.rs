//! Settings API handlers
//!
//! Read and update the active tab's connection settings.

use crate::assistant::session::{SessionSettings, SessionStore, SettingsUpdate, TabsView};
use crate::error::AppError;
use crate::llm::ChatMessage;
use crate::state::SharedState;
use axum::{extract::State, response::Json};
use serde::Serialize;
use serde_json::Value;

/// Everything a client needs to render the active tab
#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
    /// Active tab settings
    pub settings: SessionSettings,
    /// Tab strip
    pub tabs: TabsView,
    /// Active tab history
    pub history: Vec<ChatMessage>,
}

impl From<&SessionStore> for WorkspaceResponse {
    fn from(store: &SessionStore) -> Self {
        Self {
            settings: store.current().settings(),
            tabs: store.tabs(),
            history: store.current().history.clone(),
        }
    }
}

/// GET /api/settings - Active tab settings, tabs and history
pub async fn get_settings(State(state): State<SharedState>) -> Json<WorkspaceResponse> {
    let store = state.sessions.read().await;
    Json(WorkspaceResponse::from(&*store))
}

/// PUT /api/settings - Partially update the active tab's settings
///
/// After saving, the model server is asked for the context window of the
/// (possibly new) model.
pub async fn update_settings(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    if !body.is_object() {
        return Err(AppError::InvalidRequest(
            "Settings must be a JSON object".to_string(),
        ));
    }
    let update = SettingsUpdate::from_value(&body);
    state.sessions.write().await.update_settings(update)?;
    tracing::info!("Settings updated");

    state.refresh_context_length().await;

    let store = state.sessions.read().await;
    Ok(Json(WorkspaceResponse::from(&*store)))
}
