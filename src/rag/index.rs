//! Persisted vector index
//!
//! An index directory holds three files:
//! - `vectors.npy`: `(n, dim)` matrix of normalised embeddings
//! - `meta.json`: one record per row (`{id, text, meta}`)
//! - `config.json`: which model and provider built the index, from where, and when
//!
//! Search is a linear dot-product scan over the whole matrix.

use super::embedder::{EmbedError, EmbedderKind};
use super::npy::{self, Matrix, NpyError};
use crate::config::DEFAULT_EMBED_MODEL;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Vector matrix file name
pub const VECTORS_FILE: &str = "vectors.npy";
/// Record list file name
pub const META_FILE: &str = "meta.json";
/// Build config file name
pub const CONFIG_FILE: &str = "config.json";

/// Errors raised while loading, saving or querying an index
#[derive(Error, Debug)]
pub enum IndexError {
    /// `vectors.npy` or `meta.json` is absent
    #[error("Index missing. Build it first. (looked in {0})")]
    Missing(String),

    /// Matrix codec failure
    #[error(transparent)]
    Npy(#[from] NpyError),

    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `meta.json` or `config.json` is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Matrix rows and records disagree
    #[error("Index is inconsistent: {rows} vectors but {records} records")]
    RowCountMismatch {
        /// Rows in `vectors.npy`
        rows: usize,
        /// Entries in `meta.json`
        records: usize,
    },

    /// Query vector has the wrong length
    #[error("Query dimension {found} does not match index dimension {expected}")]
    DimensionMismatch {
        /// Index dimension
        expected: usize,
        /// Query length
        found: usize,
    },
}

/// One indexed chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    /// Content-derived chunk id
    pub id: String,
    /// Chunk text
    pub text: String,
    /// Free-form metadata (at least `path` when built by this crate)
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// Contents of `config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IndexConfig {
    /// Embedding model identifier
    #[serde(default)]
    pub model: Option<String>,
    /// Corpus folder the index was built from
    #[serde(default)]
    pub built_from: Option<String>,
    /// Build time (RFC 3339)
    #[serde(default)]
    pub built_at: Option<String>,
    /// Embedding provider name (`openai`, `ollama`, `hashing`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Search result
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    /// Chunk id
    pub id: String,
    /// Dot product with the query
    pub score: f32,
    /// Chunk text
    pub text: String,
    /// Chunk metadata
    pub meta: Map<String, Value>,
}

/// In-memory index, read-only once loaded
#[derive(Debug, Clone)]
pub struct VectorIndex {
    matrix: Matrix,
    records: Vec<ChunkRecord>,
    config: IndexConfig,
}

impl VectorIndex {
    /// Assemble an index from parts
    ///
    /// # Errors
    /// * `RowCountMismatch` if `matrix.rows != records.len()`
    pub fn new(
        matrix: Matrix,
        records: Vec<ChunkRecord>,
        config: IndexConfig,
    ) -> Result<Self, IndexError> {
        if matrix.rows != records.len() {
            return Err(IndexError::RowCountMismatch {
                rows: matrix.rows,
                records: records.len(),
            });
        }
        Ok(Self {
            matrix,
            records,
            config,
        })
    }

    /// Load an index directory
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let vectors_path = dir.join(VECTORS_FILE);
        let meta_path = dir.join(META_FILE);
        if !vectors_path.exists() || !meta_path.exists() {
            return Err(IndexError::Missing(dir.display().to_string()));
        }

        let matrix = npy::read_matrix(&vectors_path)?;
        let records: Vec<ChunkRecord> = serde_json::from_str(&fs::read_to_string(&meta_path)?)?;

        let config_path = dir.join(CONFIG_FILE);
        let config = if config_path.exists() {
            serde_json::from_str(&fs::read_to_string(&config_path)?)?
        } else {
            IndexConfig::default()
        };

        let index = Self::new(matrix, records, config)?;
        tracing::info!(
            dir = %dir.display(),
            records = index.len(),
            dimension = index.dimension(),
            "Loaded vector index"
        );
        Ok(index)
    }

    /// Write all three files into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(dir)?;
        npy::write_matrix(&dir.join(VECTORS_FILE), &self.matrix)?;
        fs::write(
            dir.join(META_FILE),
            serde_json::to_string_pretty(&self.records)?,
        )?;
        fs::write(
            dir.join(CONFIG_FILE),
            serde_json::to_string_pretty(&self.config)?,
        )?;
        Ok(())
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the index holds no chunks
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.matrix.cols
    }

    /// Build configuration
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Score every row against `query` and return the `top_k` best
    ///
    /// Results are in descending score order; equal scores keep row order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension(),
                found: query.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = (0..self.matrix.rows)
            .map(|i| {
                let score = self
                    .matrix
                    .row(i)
                    .iter()
                    .zip(query)
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (i, score)
            })
            .collect();
        // sort_by is stable, so ties stay in row order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let record = &self.records[i];
                SearchHit {
                    id: record.id.clone(),
                    score,
                    text: record.text.clone(),
                    meta: record.meta.clone(),
                }
            })
            .collect())
    }
}

/// Pick the embedding model for serving: override, then index config, then default
pub fn resolve_model_id(override_model: Option<&str>, config: &IndexConfig) -> String {
    override_model
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| config.model.clone().filter(|m| !m.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string())
}

/// Pick the embedding provider for serving: override, then index config, then `openai`
///
/// # Errors
/// * `EmbedError::UnknownProvider` if the chosen name is not a known provider
pub fn resolve_provider(
    override_provider: Option<&str>,
    config: &IndexConfig,
) -> Result<EmbedderKind, EmbedError> {
    override_provider
        .or(config.provider.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map_or(Ok(EmbedderKind::OpenAi), |p| p.parse())
}
