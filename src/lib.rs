//! Glyphs Assistant Library
//!
//! This library exposes modules for testing and the binaries.
//! The assistant server is in `src/main.rs`; the search service and the
//! index builder live under `src/bin/`.

pub mod api;
pub mod assistant;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod rag;
pub mod server;
/// Application state management
///
/// Holds the session store and the ask pipeline shared by handlers.
pub mod state;
