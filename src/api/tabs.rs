//! Tab management API handlers

use super::settings::WorkspaceResponse;
use crate::assistant::session::TabsView;
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

/// Rename request
#[derive(Deserialize)]
pub struct RenameTabRequest {
    /// New tab label
    pub name: String,
}

/// GET /api/tabs - Tab names, models and the active index
pub async fn list_tabs(State(state): State<SharedState>) -> Json<TabsView> {
    Json(state.sessions.read().await.tabs())
}

/// POST /api/tabs - Open a tab with the current settings
pub async fn create_tab(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<WorkspaceResponse>), AppError> {
    let mut store = state.sessions.write().await;
    let index = store.new_tab()?;
    tracing::info!(index, "Tab created");
    Ok((StatusCode::CREATED, Json(WorkspaceResponse::from(&*store))))
}

/// POST /api/tabs/:index/activate - Switch to a tab
pub async fn activate_tab(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let mut store = state.sessions.write().await;
    store.switch_tab(index)?;
    Ok(Json(WorkspaceResponse::from(&*store)))
}

/// DELETE /api/tabs/:index - Close a tab
pub async fn close_tab(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let mut store = state.sessions.write().await;
    store.close_tab(index)?;
    tracing::info!(index, remaining = store.sessions().len(), "Tab closed");
    Ok(Json(WorkspaceResponse::from(&*store)))
}

/// PUT /api/tabs/:index/name - Rename a tab
pub async fn rename_tab(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
    Json(request): Json<RenameTabRequest>,
) -> Result<Json<TabsView>, AppError> {
    let mut store = state.sessions.write().await;
    store.rename_tab(index, &request.name)?;
    Ok(Json(store.tabs()))
}
