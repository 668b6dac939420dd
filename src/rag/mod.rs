//! Retrieval side service
//!
//! Corpus chunking, embedding, the persisted vector index, the offline
//! builder and the `/search` HTTP service.

pub mod builder;
pub mod chunker;
pub mod embedder;
pub mod index;
pub mod npy;
pub mod server;

pub use embedder::{build_embedder, EmbedError, Embedder, EmbedderKind};
pub use index::{IndexError, SearchHit, VectorIndex};
pub use npy::NpyError;
