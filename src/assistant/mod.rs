//! Chat assistant
//!
//! Sessions and their persistence, prompt presets, the token budget,
//! retrieval, answer clean-up and the ask pipeline tying them together.

pub mod budget;
pub mod orchestrator;
pub mod postprocess;
pub mod prompts;
pub mod retrieval;
/// Chat tabs and the session file
pub mod session;

pub use orchestrator::{AskOutcome, Assistant};
pub use session::{Session, SessionStore, SettingsUpdate};
