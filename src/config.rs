//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::path::PathBuf;

/// Embedding model used when neither the environment nor the index config names one
pub const DEFAULT_EMBED_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Assistant server configuration
    pub server: ServerConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
    /// Outbound HTTP configuration
    pub http: HttpConfig,
    /// Vector search service configuration
    pub rag: RagConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Base directory for storing session data
    pub data_dir: String,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Timeout for JSON POST requests (search service), in seconds
    pub post_timeout_secs: u64,
    /// Timeout for JSON GET requests (model listing), in seconds
    pub get_timeout_secs: u64,
}

/// Vector search service configuration
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Address the search service binds to
    pub server: ServerConfig,
    /// Directory holding `vectors.npy`, `meta.json` and `config.json`
    pub index_dir: PathBuf,
    /// Bearer token required by `/search` (empty = no auth)
    pub api_token: String,
    /// Embedding model override (takes precedence over the index config)
    pub embed_model: Option<String>,
    /// Embedding provider override (`openai`, `ollama`, `hashing`)
    pub embed_provider: Option<String>,
    /// Base URL of the embedding provider
    pub embed_base_url: Option<String>,
    /// API key for the embedding provider
    pub embed_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            persistence: PersistenceConfig {
                data_dir: env::var("DATA_DIR").unwrap_or_else(|_| {
                    // Default to ~/.glyphs-assistant or current directory
                    if let Some(home) = env::var_os("HOME") {
                        format!("{}/.glyphs-assistant", home.to_string_lossy())
                    } else {
                        ".glyphs-assistant".to_string()
                    }
                }),
            },
            http: HttpConfig {
                post_timeout_secs: env::var("HTTP_POST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(25),
                get_timeout_secs: env::var("HTTP_GET_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(10),
            },
            rag: RagConfig {
                server: ServerConfig {
                    port: env::var("RAG_PORT")
                        .ok()
                        .and_then(|p| p.parse().ok())
                        .unwrap_or(8000),
                    host: env::var("RAG_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                },
                index_dir: PathBuf::from(
                    env::var("RAG_INDEX_DIR").unwrap_or_else(|_| "index".to_string()),
                ),
                api_token: env::var("RAG_API_TOKEN").unwrap_or_default(),
                embed_model: non_empty_var("RAG_EMBED_MODEL"),
                embed_provider: non_empty_var("RAG_EMBED_PROVIDER"),
                embed_base_url: non_empty_var("RAG_EMBED_BASE_URL"),
                embed_api_key: non_empty_var("RAG_EMBED_API_KEY"),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the search service address as a string
    pub fn rag_addr(&self) -> String {
        format!("{}:{}", self.rag.server.host, self.rag.server.port)
    }

    /// Path of the persisted session store
    pub fn sessions_path(&self) -> PathBuf {
        PathBuf::from(&self.persistence.data_dir).join("sessions.json")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
