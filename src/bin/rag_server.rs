//! Vector search service.
//!
//! Loads the index once, then serves `POST /search` and `GET /health`.

use glyphs_assistant::config::Config;
use glyphs_assistant::http::HttpClient;
use glyphs_assistant::rag::embedder::HASHING_DIMENSIONS;
use glyphs_assistant::rag::index::{resolve_model_id, resolve_provider};
use glyphs_assistant::rag::server::{router, RagState};
use glyphs_assistant::rag::{build_embedder, EmbedderKind, VectorIndex};
use glyphs_assistant::server::{init_tracing, shutdown_signal, with_http_layers};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env();
    let rag = &config.rag;

    let index = VectorIndex::load(&rag.index_dir)?;
    let model = resolve_model_id(rag.embed_model.as_deref(), index.config());
    let kind = resolve_provider(rag.embed_provider.as_deref(), index.config())?;
    if let Some(recorded) = index.config().provider.as_deref() {
        if recorded.parse::<EmbedderKind>().ok() != Some(kind) {
            warn!(
                built_with = %recorded,
                serving_with = kind.as_str(),
                "Index was built with a different embedding provider"
            );
        }
    }
    if kind == EmbedderKind::Hashing && index.dimension() != HASHING_DIMENSIONS {
        warn!(
            index_dimension = index.dimension(),
            embedder_dimension = HASHING_DIMENSIONS,
            "Index dimension does not match the hashing embedder"
        );
    }
    let embedder = build_embedder(
        kind,
        &model,
        rag.embed_base_url.as_deref(),
        rag.embed_api_key.as_deref(),
        HttpClient::new()?,
    );
    info!(
        model = %model,
        provider = kind.as_str(),
        records = index.len(),
        auth = !rag.api_token.is_empty(),
        "Search service ready"
    );

    let state = Arc::new(RagState {
        index,
        embedder,
        api_token: rag.api_token.clone(),
    });
    let app = with_http_layers(router(state));

    let addr: SocketAddr = config
        .rag_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("🚀 Search service running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
