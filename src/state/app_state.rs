// Application state management
// Holds the session store and the ask pipeline shared by all handlers

use crate::assistant::retrieval::RagClient;
use crate::assistant::{Assistant, Session, SessionStore};
use crate::config::Config;
use crate::http::{HttpClient, HttpError};
use crate::llm::LlmClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Shared handle used as axum state
pub type SharedState = Arc<AppState>;

/// Application state
pub struct AppState {
    /// Tabs and their history
    pub sessions: RwLock<SessionStore>,
    /// Question answering pipeline
    pub assistant: Assistant,
}

impl AppState {
    /// Create state from an already-loaded store
    pub fn new(sessions: SessionStore, assistant: Assistant) -> Self {
        Self {
            sessions: RwLock::new(sessions),
            assistant,
        }
    }

    /// Build state from configuration, loading the session store from disk
    ///
    /// # Errors
    /// * Returns `HttpError::Client` if the HTTP client cannot be created
    pub fn from_config(config: &Config) -> Result<Self, HttpError> {
        let http = HttpClient::new()?;
        let llm = LlmClient::new(
            http.clone(),
            Duration::from_secs(config.http.get_timeout_secs),
        );
        let rag = RagClient::new(http, Duration::from_secs(config.http.post_timeout_secs));
        let store = SessionStore::load(config.sessions_path());
        Ok(Self::new(store, Assistant::new(llm, rag)))
    }

    /// Snapshot of the active session
    pub async fn current_session(&self) -> Session {
        self.sessions.read().await.current().clone()
    }

    /// Ask the model server for the active session's context window and store it
    ///
    /// Returns the detected size when it changed the session.
    pub async fn refresh_context_length(&self) -> Option<u32> {
        let session = self.current_session().await;
        let tokens = self.assistant.detect_context_length(&session).await?;
        match self
            .sessions
            .write()
            .await
            .set_max_context(&session.id, tokens)
        {
            Ok(true) => {
                tracing::info!(model = %session.llm_model, tokens, "Detected model context");
                Some(tokens)
            }
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to store detected context length");
                None
            }
        }
    }
}
