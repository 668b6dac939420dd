//! Offline index builder.

use clap::Parser;
use glyphs_assistant::config::DEFAULT_EMBED_MODEL;
use glyphs_assistant::http::HttpClient;
use glyphs_assistant::rag::builder::{build_index, BuildOptions};
use glyphs_assistant::rag::chunker::{DEFAULT_CHUNK_CHARS, DEFAULT_OVERLAP_CHARS};
use glyphs_assistant::rag::{build_embedder, EmbedderKind};
use glyphs_assistant::server::init_tracing;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "build-index")]
#[command(about = "Chunk a folder of .md/.txt files, embed the chunks and write a vector index")]
struct Args {
    /// Corpus folder
    #[arg(long)]
    source: PathBuf,

    /// Output index directory
    #[arg(long, default_value = "index")]
    outdir: PathBuf,

    /// Embedding model identifier
    #[arg(long, env = "RAG_EMBED_MODEL", default_value = DEFAULT_EMBED_MODEL)]
    model: String,

    /// Window size in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_CHARS)]
    chunk: usize,

    /// Overlap between windows in characters
    #[arg(long, default_value_t = DEFAULT_OVERLAP_CHARS)]
    overlap: usize,

    /// Embedding provider: openai, ollama or hashing
    #[arg(long, env = "RAG_EMBED_PROVIDER", default_value = "openai")]
    provider: String,

    /// Embedding provider base URL
    #[arg(long, env = "RAG_EMBED_BASE_URL")]
    embed_base_url: Option<String>,

    /// Embedding provider API key
    #[arg(long, env = "RAG_EMBED_API_KEY", hide_env_values = true)]
    embed_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    if args.overlap >= args.chunk {
        anyhow::bail!(
            "--overlap ({}) must be smaller than --chunk ({})",
            args.overlap,
            args.chunk
        );
    }

    let kind: EmbedderKind = args.provider.parse()?;
    let embedder = build_embedder(
        kind,
        &args.model,
        args.embed_base_url.as_deref(),
        args.embed_api_key.as_deref(),
        HttpClient::new()?,
    );

    let options = BuildOptions {
        source: args.source,
        outdir: args.outdir,
        chunk_chars: args.chunk,
        overlap_chars: args.overlap,
    };
    let report = build_index(&options, embedder.as_ref()).await?;

    if report.chunks == 0 {
        println!("No text found");
    } else {
        println!(
            "Indexed {} chunks from {} files.",
            report.chunks, report.files
        );
    }
    Ok(())
}
