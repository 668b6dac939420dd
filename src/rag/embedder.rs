//! Pluggable embedding providers
//!
//! Provides a trait-based abstraction over embedding models, with
//! implementations for OpenAI-compatible servers, the Ollama API, and a
//! local feature-hashing embedder that needs no network.
//!
//! Every provider returns L2-normalised vectors, so a dot product between a
//! query and an indexed row is their cosine similarity.

use crate::http::{HttpClient, HttpError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Number of texts sent per embedding request
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Dimensionality of the hashing embedder
pub const HASHING_DIMENSIONS: usize = 384;

const EMBED_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised by embedding providers
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Transport or status failure
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Response did not have the expected shape
    #[error("Unexpected embedding response: {0}")]
    UnexpectedResponse(String),

    /// Provider returned a different number of vectors than texts sent
    #[error("Embedding count mismatch: sent {sent} texts, received {received} vectors")]
    CountMismatch {
        /// Texts in the request
        sent: usize,
        /// Vectors in the response
        received: usize,
    },

    /// Unknown provider name
    #[error("Unknown embedding provider '{0}' (expected openai, ollama or hashing)")]
    UnknownProvider(String),
}

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model
    fn model_id(&self) -> &str;

    /// Back-end serving the model
    fn kind(&self) -> EmbedderKind;

    /// Embed a batch of texts, one normalised vector per text
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single query string
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbedError::CountMismatch {
            sent: 1,
            received: 0,
        })
    }
}

/// Supported embedding back-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    /// OpenAI-compatible `/embeddings`
    OpenAi,
    /// Ollama `/api/embed`
    Ollama,
    /// Local feature hashing
    Hashing,
}

impl EmbedderKind {
    /// Name recorded in `config.json`
    pub fn as_str(self) -> &'static str {
        match self {
            EmbedderKind::OpenAi => "openai",
            EmbedderKind::Ollama => "ollama",
            EmbedderKind::Hashing => "hashing",
        }
    }
}

impl FromStr for EmbedderKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(EmbedderKind::OpenAi),
            "ollama" => Ok(EmbedderKind::Ollama),
            "hashing" | "local" => Ok(EmbedderKind::Hashing),
            other => Err(EmbedError::UnknownProvider(other.to_string())),
        }
    }
}

/// Build an embedder for `kind`
///
/// # Arguments
/// * `kind` - Provider to use
/// * `model` - Model identifier sent to the provider
/// * `base_url` - Provider base URL (defaults per provider when `None`)
/// * `api_key` - Bearer key for the OpenAI-compatible provider
pub fn build_embedder(
    kind: EmbedderKind,
    model: &str,
    base_url: Option<&str>,
    api_key: Option<&str>,
    http: HttpClient,
) -> Arc<dyn Embedder> {
    match kind {
        EmbedderKind::OpenAi => Arc::new(OpenAiEmbedder::new(
            http,
            model.to_string(),
            base_url.unwrap_or("http://localhost:1234/v1").to_string(),
            api_key.map(str::to_string),
        )),
        EmbedderKind::Ollama => Arc::new(OllamaEmbedder::new(
            http,
            model.to_string(),
            base_url.unwrap_or("http://localhost:11434").to_string(),
        )),
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(
            model.to_string(),
            HASHING_DIMENSIONS,
        )),
    }
}

/// Scale `v` to unit length (zero vectors stay zero)
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn check_count(sent: usize, vectors: &[Vec<f32>]) -> Result<(), EmbedError> {
    if vectors.len() != sent {
        return Err(EmbedError::CountMismatch {
            sent,
            received: vectors.len(),
        });
    }
    Ok(())
}

/// OpenAI-compatible embedder (`POST {base}/embeddings`)
pub struct OpenAiEmbedder {
    http: HttpClient,
    model: String,
    base_url: String,
    api_key: Option<String>,
    batch_size: usize,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create an embedder for `model` served at `base_url` (e.g. `http://host/v1`)
    pub fn new(http: HttpClient, model: String, base_url: String, api_key: Option<String>) -> Self {
        Self {
            http,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = json!({ "model": self.model, "input": texts });
        let value = self
            .http
            .post_json(&url, &body, self.api_key.as_deref(), EMBED_TIMEOUT)
            .await?;
        let mut parsed: OpenAiEmbeddingResponse = serde_json::from_value(value)
            .map_err(|e| EmbedError::UnexpectedResponse(e.to_string()))?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> EmbedderKind {
        EmbedderKind::OpenAi
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let vectors = self.embed_chunk(chunk).await?;
            check_count(chunk.len(), &vectors)?;
            out.extend(vectors);
        }
        for v in &mut out {
            normalize(v);
        }
        Ok(out)
    }
}

/// Ollama embedder (`POST {base}/api/embed`)
pub struct OllamaEmbedder {
    http: HttpClient,
    model: String,
    base_url: String,
    batch_size: usize,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    /// Create an embedder for `model` served by Ollama at `base_url`
    pub fn new(http: HttpClient, model: String, base_url: String) -> Self {
        Self {
            http,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> EmbedderKind {
        EmbedderKind::Ollama
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let url = format!("{}/api/embed", self.base_url);
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let body = json!({ "model": self.model, "input": chunk });
            let value = self.http.post_json(&url, &body, None, EMBED_TIMEOUT).await?;
            let parsed: OllamaEmbedResponse = serde_json::from_value(value)
                .map_err(|e| EmbedError::UnexpectedResponse(e.to_string()))?;
            check_count(chunk.len(), &parsed.embeddings)?;
            out.extend(parsed.embeddings);
        }
        for v in &mut out {
            normalize(v);
        }
        Ok(out)
    }
}

/// Local bag-of-words feature hashing embedder
///
/// Lowercases, splits on non-alphanumerics, hashes each term into a bucket
/// and L2-normalises the counts. Buckets come from djb2, so an index built
/// by one binary stays valid for any other.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    model: String,
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create a hashing embedder with `dimensions` buckets
    pub fn new(model: String, dimensions: usize) -> Self {
        Self {
            model,
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let idx = (djb2(word) % self.dimensions as u64) as usize;
            vector[idx] += 1.0;
        }
        normalize(&mut vector);
        vector
    }
}

/// djb2 string hash with 64-bit wrapping arithmetic
fn djb2(s: &str) -> u64 {
    let mut hash: u64 = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(b));
    }
    hash
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn kind(&self) -> EmbedderKind {
        EmbedderKind::Hashing
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
