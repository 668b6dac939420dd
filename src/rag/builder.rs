//! Offline index builder
//!
//! Reads a corpus folder, chunks every document, embeds the chunks and
//! writes an index directory.

use super::chunker::{chunk_id, chunk_text, read_corpus};
use super::embedder::{EmbedError, Embedder};
use super::index::{ChunkRecord, IndexConfig, IndexError, VectorIndex};
use super::npy::Matrix;
use serde_json::{json, Map};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`build_index`]
#[derive(Error, Debug)]
pub enum BuildError {
    /// Chunk and overlap sizes are unusable
    #[error("Invalid chunking: {0}")]
    InvalidOptions(String),

    /// Embedding provider failed
    #[error(transparent)]
    Embed(#[from] EmbedError),

    /// Index could not be written
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Inputs to a build run
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Corpus folder
    pub source: PathBuf,
    /// Output index directory
    pub outdir: PathBuf,
    /// Window size in characters
    pub chunk_chars: usize,
    /// Overlap in characters
    pub overlap_chars: usize,
}

/// Summary of a build run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    /// Chunks written (0 means nothing was written)
    pub chunks: usize,
    /// Corpus files read
    pub files: usize,
}

/// Build an index from `options.source` into `options.outdir`
///
/// When the corpus yields no chunks nothing is written and the report has
/// `chunks == 0`.
pub async fn build_index(
    options: &BuildOptions,
    embedder: &dyn Embedder,
) -> Result<BuildReport, BuildError> {
    if options.chunk_chars == 0 {
        return Err(BuildError::InvalidOptions(
            "chunk size must be positive".to_string(),
        ));
    }
    if options.overlap_chars >= options.chunk_chars {
        return Err(BuildError::InvalidOptions(format!(
            "overlap ({}) must be smaller than chunk size ({})",
            options.overlap_chars, options.chunk_chars
        )));
    }

    let docs = read_corpus(&options.source);
    let mut records = Vec::new();
    for doc in &docs {
        for chunk in chunk_text(&doc.text, options.chunk_chars, options.overlap_chars) {
            let mut meta = Map::new();
            meta.insert("path".to_string(), json!(doc.path));
            records.push(ChunkRecord {
                id: chunk_id(&doc.path, &chunk),
                text: chunk,
                meta,
            });
        }
    }

    let report = BuildReport {
        chunks: records.len(),
        files: docs.len(),
    };
    if records.is_empty() {
        tracing::warn!(source = %options.source.display(), "No text found in corpus");
        return Ok(report);
    }

    tracing::info!(
        chunks = report.chunks,
        files = report.files,
        model = %embedder.model_id(),
        "Embedding corpus"
    );
    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    if vectors.len() != records.len() {
        return Err(EmbedError::CountMismatch {
            sent: records.len(),
            received: vectors.len(),
        }
        .into());
    }
    let cols = vectors.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = vectors.iter().find(|v| v.len() != cols) {
        return Err(IndexError::DimensionMismatch {
            expected: cols,
            found: bad.len(),
        }
        .into());
    }

    let matrix = Matrix {
        rows: vectors.len(),
        cols,
        data: vectors.into_iter().flatten().collect(),
    };
    let built_from = std::fs::canonicalize(&options.source)
        .unwrap_or_else(|_| options.source.clone())
        .display()
        .to_string();
    let config = IndexConfig {
        model: Some(embedder.model_id().to_string()),
        built_from: Some(built_from),
        built_at: Some(chrono::Utc::now().to_rfc3339()),
        provider: Some(embedder.kind().as_str().to_string()),
    };

    VectorIndex::new(matrix, records, config)?.save(&options.outdir)?;
    tracing::info!(outdir = %options.outdir.display(), "Index written");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embedder::HashingEmbedder;
    use crate::rag::index::{CONFIG_FILE, META_FILE, VECTORS_FILE};
    use tempfile::tempdir;

    fn options(source: PathBuf, outdir: PathBuf) -> BuildOptions {
        BuildOptions {
            source,
            outdir,
            chunk_chars: 40,
            overlap_chars: 10,
        }
    }

    #[tokio::test]
    async fn test_build_writes_index() {
        let corpus = tempdir().expect("Failed to create temp dir");
        let out = tempdir().expect("Failed to create temp dir");
        std::fs::write(
            corpus.path().join("GSFont.md"),
            "GSFont holds glyphs, masters and instances. Use font.glyphs to iterate.",
        )
        .unwrap();
        std::fs::write(corpus.path().join("GSLayer.txt"), "GSLayer has paths.").unwrap();
        std::fs::write(corpus.path().join("blank.md"), "   \n").unwrap();

        let embedder = HashingEmbedder::new("hashing".to_string(), 64);
        let outdir = out.path().join("index");
        let report = build_index(&options(corpus.path().to_path_buf(), outdir.clone()), &embedder)
            .await
            .unwrap();

        assert_eq!(report.files, 3);
        assert_eq!(report.chunks, 4);
        let index = VectorIndex::load(&outdir).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.dimension(), 64);
        assert_eq!(index.config().model.as_deref(), Some("hashing"));
        assert!(index.config().built_at.is_some());
        assert_eq!(index.config().provider.as_deref(), Some("hashing"));
    }

    #[tokio::test]
    async fn test_build_empty_corpus_writes_nothing() {
        let corpus = tempdir().expect("Failed to create temp dir");
        let out = tempdir().expect("Failed to create temp dir");
        std::fs::write(corpus.path().join("image.png"), [0u8, 1]).unwrap();

        let embedder = HashingEmbedder::new("hashing".to_string(), 8);
        let outdir = out.path().join("index");
        let report = build_index(&options(corpus.path().to_path_buf(), outdir.clone()), &embedder)
            .await
            .unwrap();

        assert_eq!(report, BuildReport { chunks: 0, files: 0 });
        assert!(!outdir.join(VECTORS_FILE).exists());
        assert!(!outdir.join(META_FILE).exists());
        assert!(!outdir.join(CONFIG_FILE).exists());
    }

    #[tokio::test]
    async fn test_build_rejects_overlap_not_smaller_than_chunk() {
        let dir = tempdir().expect("Failed to create temp dir");
        let embedder = HashingEmbedder::new("hashing".to_string(), 8);
        let mut opts = options(dir.path().to_path_buf(), dir.path().join("index"));
        opts.overlap_chars = opts.chunk_chars;

        match build_index(&opts, &embedder).await {
            Err(BuildError::InvalidOptions(msg)) => assert!(msg.contains("overlap")),
            other => panic!("Expected InvalidOptions, got: {:?}", other),
        }
    }
}
