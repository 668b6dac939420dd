//! Search-service client
//!
//! Queries the vector search service and formats the hits as numbered
//! `[S#]` sources for the prompt.

use crate::http::HttpClient;
use serde_json::{json, Value};
use std::time::Duration;

/// Passages included in a prompt
pub const MAX_CONTEXT_CHUNKS: usize = 5;

/// Per-passage character limit
pub const CHUNK_CHAR_LIMIT: usize = 1200;

/// Minimum top score for the context to count as relevant
pub const RELEVANCE_THRESHOLD: f64 = 0.40;

/// Formatted retrieval result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    /// `[S#]` blocks joined by blank lines
    pub text: String,
    /// Results returned by the service
    pub chunks: usize,
    /// Score of the best result, when reported
    pub top_score: Option<f64>,
}

impl RetrievedContext {
    /// True when there is at least one result and the best one is relevant enough
    pub fn has_context(&self) -> bool {
        self.chunks > 0 && self.top_score.map_or(true, |s| s >= RELEVANCE_THRESHOLD)
    }
}

/// Client for `POST {ragURL}`
#[derive(Clone)]
pub struct RagClient {
    http: HttpClient,
    timeout: Duration,
}

impl RagClient {
    /// Create a client sharing the given transport
    pub fn new(http: HttpClient, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Retrieve context for `query`
    ///
    /// Errors are logged and yield an empty context so the question can
    /// still be answered without sources.
    pub async fn retrieve(
        &self,
        url: &str,
        token: &str,
        top_k: u32,
        query: &str,
    ) -> RetrievedContext {
        let top_k = (top_k as usize).min(MAX_CONTEXT_CHUNKS);
        let bearer = Some(token).filter(|t| !t.is_empty());
        let payload = json!({ "query": query, "top_k": top_k });

        match self.http.post_json(url, &payload, bearer, self.timeout).await {
            Ok(response) => {
                let context = format_context(&response);
                tracing::debug!(
                    chunks = context.chunks,
                    top_score = ?context.top_score,
                    "Retrieved context"
                );
                context
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "RAG error");
                RetrievedContext::default()
            }
        }
    }
}

/// Turn a `{results: [...]}` response into prompt context
pub fn format_context(response: &Value) -> RetrievedContext {
    let results: &[Value] = response
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let top_score = results
        .first()
        .and_then(|r| r.get("score"))
        .and_then(Value::as_f64);

    let parts: Vec<String> = results
        .iter()
        .take(MAX_CONTEXT_CHUNKS)
        .enumerate()
        .map(|(i, r)| {
            let meta = r.get("meta");
            let source = ["path", "source"]
                .iter()
                .filter_map(|k| meta.and_then(|m| m.get(*k)).and_then(Value::as_str))
                .find(|s| !s.is_empty())
                .unwrap_or("?");
            let text = r.get("text").and_then(Value::as_str).unwrap_or("").trim();
            let text = if text.chars().count() > CHUNK_CHAR_LIMIT {
                let cut: String = text.chars().take(CHUNK_CHAR_LIMIT).collect();
                format!("{} …", cut)
            } else {
                text.to_string()
            };
            format!("[S{}] {}\n{}", i + 1, source, text)
        })
        .collect();

    RetrievedContext {
        text: parts.join("\n\n"),
        chunks: results.len(),
        top_score,
    }
}
