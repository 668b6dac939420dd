//! Vector search HTTP service
//!
//! `POST /search` embeds the query and scans the loaded index;
//! `GET /health` reports what is loaded.

use super::embedder::Embedder;
use super::index::{SearchHit, VectorIndex};
use crate::error::AppError;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default number of results
pub const DEFAULT_TOP_K: usize = 5;

/// Shared state of the search service
pub struct RagState {
    /// Loaded index
    pub index: VectorIndex,
    /// Query embedder (same model family as the index)
    pub embedder: Arc<dyn Embedder>,
    /// Required bearer token; empty disables auth
    pub api_token: String,
}

/// Search request body
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Free-text query
    pub query: String,
    /// Number of results
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Search response body
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// Best matches, highest score first
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    records: usize,
    dimension: usize,
    model: String,
}

/// Build the search service router
pub fn router(state: Arc<RagState>) -> Router {
    Router::new()
        .route("/search", post(search))
        .route("/health", get(health))
        .with_state(state)
}

fn authorize(headers: &HeaderMap, token: &str) -> Result<(), AppError> {
    if token.is_empty() {
        return Ok(());
    }
    let expected = format!("Bearer {}", token);
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

async fn search(
    State(state): State<Arc<RagState>>,
    headers: HeaderMap,
    Json(request): Json<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    authorize(&headers, &state.api_token)?;

    let query_vec = state.embedder.embed_query(&request.query).await?;
    let results = state.index.search(&query_vec, request.top_k)?;

    tracing::debug!(
        top_k = request.top_k,
        returned = results.len(),
        top_score = results.first().map(|h| h.score),
        "Search served"
    );
    Ok(Json(SearchResponse { results }))
}

async fn health(State(state): State<Arc<RagState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        records: state.index.len(),
        dimension: state.index.dimension(),
        model: state.embedder.model_id().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embedder::HashingEmbedder;
    use crate::rag::index::{ChunkRecord, IndexConfig};
    use crate::rag::npy::Matrix;
    use axum::http::HeaderValue;
    use serde_json::Map;

    async fn state_with_token(token: &str) -> Arc<RagState> {
        let embedder = HashingEmbedder::new("hashing".to_string(), 32);
        let texts = vec![
            "kerning pairs between glyphs".to_string(),
            "export instances as OTF".to_string(),
        ];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        let records = texts
            .iter()
            .enumerate()
            .map(|(i, t)| ChunkRecord {
                id: format!("c{}", i),
                text: t.clone(),
                meta: Map::new(),
            })
            .collect();
        let matrix = Matrix {
            rows: 2,
            cols: 32,
            data: vectors.into_iter().flatten().collect(),
        };
        Arc::new(RagState {
            index: VectorIndex::new(matrix, records, IndexConfig::default()).unwrap(),
            embedder: Arc::new(embedder),
            api_token: token.to_string(),
        })
    }

    #[test]
    fn test_authorize() {
        let mut headers = HeaderMap::new();
        assert!(authorize(&headers, "").is_ok());
        assert!(matches!(
            authorize(&headers, "t0k"),
            Err(AppError::Unauthorized)
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer wrong"));
        assert!(authorize(&headers, "t0k").is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t0k"));
        assert!(authorize(&headers, "t0k").is_ok());
    }

    #[test]
    fn test_top_k_defaults_to_five() {
        let q: SearchQuery = serde_json::from_str(r#"{"query": "kerning"}"#).unwrap();
        assert_eq!(q.top_k, 5);
    }

    #[tokio::test]
    async fn test_search_handler_ranks_matching_chunk_first() {
        let state = state_with_token("").await;
        let Json(response) = search(
            State(state),
            HeaderMap::new(),
            Json(SearchQuery {
                query: "kerning glyphs".to_string(),
                top_k: 1,
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "c0");
    }

    #[tokio::test]
    async fn test_search_handler_requires_token() {
        let state = state_with_token("secret").await;
        let result = search(
            State(state),
            HeaderMap::new(),
            Json(SearchQuery {
                query: "kerning".to_string(),
                top_k: 5,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
