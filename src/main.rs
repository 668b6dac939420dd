//! Glyphs Assistant
//!
//! JSON API in front of an OpenAI-compatible chat model, with optional
//! retrieval from the vector search service and persisted chat tabs.

use glyphs_assistant::config::Config;
use glyphs_assistant::server::{init_tracing, shutdown_signal, with_http_layers};
use glyphs_assistant::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = Config::from_env();
    info!(
        addr = %config.server_addr(),
        data_dir = %config.persistence.data_dir,
        "Configuration loaded"
    );

    let app_state = Arc::new(AppState::from_config(&config)?);
    info!(
        path = %config.sessions_path().display(),
        tabs = app_state.sessions.read().await.sessions().len(),
        "Sessions loaded"
    );

    // Context detection should not delay startup
    let detect_state = app_state.clone();
    tokio::spawn(async move {
        detect_state.refresh_context_length().await;
    });

    let app = with_http_layers(glyphs_assistant::api::router(app_state));

    // Bind to address from config
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("🚀 Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
