//! API module
//!
//! HTTP handlers for the assistant: settings, tabs, questions and history.

pub mod chat;
pub mod settings;
pub mod tabs;

use crate::state::SharedState;
use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Assistant is healthy".to_string(),
    })
}

/// Build the assistant router (without middleware layers)
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        // Settings
        .route(
            "/api/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        // Chat
        .route("/api/ask", post(chat::ask))
        .route("/api/chat/new", post(chat::new_chat))
        .route("/api/history", get(chat::get_history))
        // Tabs
        .route("/api/tabs", get(tabs::list_tabs).post(tabs::create_tab))
        .route("/api/tabs/:index/activate", post(tabs::activate_tab))
        .route("/api/tabs/:index", axum::routing::delete(tabs::close_tab))
        .route("/api/tabs/:index/name", put(tabs::rename_tab))
        .with_state(state)
}
