//! Shared fixtures for integration tests

#![allow(dead_code)]

use axum::Router;
use glyphs_assistant::rag::builder::{build_index, BuildOptions};
use glyphs_assistant::rag::embedder::HashingEmbedder;
use glyphs_assistant::rag::server::{router, RagState};
use glyphs_assistant::rag::VectorIndex;
use std::path::Path;
use std::sync::Arc;

/// Token required by the fixture search service
pub const RAG_TOKEN: &str = "rag-secret";

/// Dimensions of the fixture embedder
pub const DIMENSIONS: usize = 256;

/// Text of the kerning document in the fixture corpus
pub const KERNING_TEXT: &str =
    "Kerning groups are stored on each glyph as leftKerningGroup and rightKerningGroup.";

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    format!("http://{}", addr)
}

/// Client that never goes through a proxy
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("Failed to build reqwest client")
}

/// Write a small corpus under `root/corpus`
pub fn write_corpus(root: &Path) -> std::path::PathBuf {
    let corpus = root.join("corpus");
    std::fs::create_dir_all(corpus.join("api")).expect("Failed to create corpus");
    std::fs::write(corpus.join("kerning.md"), KERNING_TEXT).expect("Failed to write corpus");
    std::fs::write(
        corpus.join("api").join("export.txt"),
        "Instances are exported with the Export dialog as OTF or variable fonts.",
    )
    .expect("Failed to write corpus");
    std::fs::write(corpus.join("logo.png"), [0u8, 1, 2]).expect("Failed to write corpus");
    corpus
}

/// Build an index from the fixture corpus and serve it; returns the base URL
pub async fn spawn_search_service(root: &Path) -> String {
    let corpus = write_corpus(root);
    let outdir = root.join("index");
    let embedder = HashingEmbedder::new("hashing".to_string(), DIMENSIONS);
    let options = BuildOptions {
        source: corpus,
        outdir: outdir.clone(),
        chunk_chars: 1800,
        overlap_chars: 200,
    };
    build_index(&options, &embedder)
        .await
        .expect("Failed to build fixture index");

    let state = Arc::new(RagState {
        index: VectorIndex::load(&outdir).expect("Failed to load fixture index"),
        embedder: Arc::new(embedder),
        api_token: RAG_TOKEN.to_string(),
    });
    spawn(router(state)).await
}
