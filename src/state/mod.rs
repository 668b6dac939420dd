// State management module
// Shared application state for the assistant server

/// Session store and assistant shared by handlers
pub mod app_state;

pub use app_state::{AppState, SharedState};
