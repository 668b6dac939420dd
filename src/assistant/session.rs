// Session persistence module
// Chat tabs, their connection settings and history, saved as one JSON file

use crate::error::AppError;
use crate::llm::{ChatMessage, ChatRole};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Turns kept per session
pub const HISTORY_CAP: usize = 80;

const STORE_VERSION: u64 = 1;

const DEFAULT_LLM_BASE: &str = "http://localhost:1234/v1";
const DEFAULT_LLM_MODEL: &str = "openai/gpt-oss-20b";
const DEFAULT_RAG_URL: &str = "http://localhost:8000/search";
const DEFAULT_TOP_K: u32 = 8;
const DEFAULT_MAX_CONTEXT: u32 = 20000;
const DEFAULT_MAX_OUTPUT: u32 = 1024;
const DEFAULT_HEADROOM: u32 = 512;

/// Failures while reading or writing the session file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// File could not be read or written
    #[error("Session file I/O failed: {0}")]
    Io(String),
    /// File contents are not valid JSON
    #[error("Session file is not valid JSON: {0}")]
    Json(String),
    /// JSON is well-formed but has the wrong shape
    #[error("Session file has an unexpected layout: {0}")]
    InvalidData(String),
}

/// How the assistant uses retrieved context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Grounded when context was found, plain chat otherwise
    #[default]
    Auto,
    /// Answer from context only
    Grounded,
    /// Prefer context, allow unverified APIs
    Hybrid,
    /// No retrieval
    Chat,
}

impl Mode {
    /// Numeric code used in stored settings
    pub fn code(self) -> u8 {
        match self {
            Mode::Auto => 0,
            Mode::Grounded => 1,
            Mode::Hybrid => 2,
            Mode::Chat => 3,
        }
    }

    /// Decode a stored code; unknown values mean `Auto`
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Mode::Grounded,
            2 => Mode::Hybrid,
            3 => Mode::Chat,
            _ => Mode::Auto,
        }
    }

    /// True for the modes that query the search service
    pub fn uses_retrieval(self) -> bool {
        !matches!(self, Mode::Chat)
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// One chat tab
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Stable id (survives renames and reordering)
    pub id: String,
    /// Tab label
    pub name: String,
    /// Chat-completions base URL
    pub llm_base: String,
    /// Model identifier
    pub llm_model: String,
    /// API key for the LLM
    pub llm_key: String,
    /// Search service URL
    #[serde(rename = "ragURL")]
    pub rag_url: String,
    /// Bearer token for the search service
    pub rag_token: String,
    /// Requested passages (capped at 5 per request)
    pub top_k: u32,
    /// Whether to query the search service at all
    #[serde(rename = "useRAG")]
    pub use_rag: bool,
    /// Prompting mode
    pub mode: Mode,
    /// Whether exchanges are appended to history
    pub remember: bool,
    /// Model context window estimate in tokens
    pub max_context: u32,
    /// Completion token cap
    pub max_output: u32,
    /// Safety margin subtracted from the context window
    pub headroom: u32,
    /// Past turns, oldest first
    pub history: Vec<ChatMessage>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            llm_base: DEFAULT_LLM_BASE.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_key: String::new(),
            rag_url: DEFAULT_RAG_URL.to_string(),
            rag_token: String::new(),
            top_k: DEFAULT_TOP_K,
            use_rag: true,
            mode: Mode::Auto,
            remember: true,
            max_context: DEFAULT_MAX_CONTEXT,
            max_output: DEFAULT_MAX_OUTPUT,
            headroom: DEFAULT_HEADROOM,
            history: Vec::new(),
        }
    }
}

impl Session {
    /// Default session with the given name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Decode a stored session, falling back to defaults field by field
    pub fn from_value(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);
        let d = Session::default();
        Self {
            id: lenient_string(obj.get("id"))
                .filter(|s| !s.is_empty())
                .unwrap_or(d.id),
            name: lenient_string(obj.get("name")).unwrap_or(d.name),
            llm_base: lenient_string(obj.get("llmBase")).unwrap_or(d.llm_base),
            llm_model: lenient_string(obj.get("llmModel")).unwrap_or(d.llm_model),
            llm_key: lenient_string(obj.get("llmKey")).unwrap_or(d.llm_key),
            rag_url: lenient_string(obj.get("ragURL")).unwrap_or(d.rag_url),
            rag_token: lenient_string(obj.get("ragToken")).unwrap_or(d.rag_token),
            top_k: lenient_u32(obj.get("topK"), d.top_k),
            use_rag: lenient_bool(obj.get("useRAG"), d.use_rag),
            mode: lenient_mode(obj.get("mode")),
            remember: lenient_bool(obj.get("remember"), d.remember),
            max_context: lenient_u32(obj.get("maxContext"), d.max_context),
            max_output: lenient_u32(obj.get("maxOutput"), d.max_output),
            headroom: lenient_u32(obj.get("headroom"), d.headroom),
            history: lenient_history(obj.get("history")),
        }
    }

    /// Settings without identity or history
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            llm_base: self.llm_base.clone(),
            llm_model: self.llm_model.clone(),
            llm_key: self.llm_key.clone(),
            rag_url: self.rag_url.clone(),
            rag_token: self.rag_token.clone(),
            top_k: self.top_k,
            use_rag: self.use_rag,
            mode: self.mode,
            remember: self.remember,
            max_context: self.max_context,
            max_output: self.max_output,
            headroom: self.headroom,
        }
    }
}

/// Connection and behaviour settings of the active tab
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    /// Chat-completions base URL
    pub llm_base: String,
    /// Model identifier
    pub llm_model: String,
    /// API key for the LLM
    pub llm_key: String,
    /// Search service URL
    #[serde(rename = "ragURL")]
    pub rag_url: String,
    /// Bearer token for the search service
    pub rag_token: String,
    /// Requested passages
    pub top_k: u32,
    /// Whether to query the search service
    #[serde(rename = "useRAG")]
    pub use_rag: bool,
    /// Prompting mode
    pub mode: Mode,
    /// Whether exchanges are remembered
    pub remember: bool,
    /// Context window estimate
    pub max_context: u32,
    /// Completion token cap
    pub max_output: u32,
    /// Safety margin
    pub headroom: u32,
}

/// Partial settings update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    /// New LLM base URL (trimmed)
    pub llm_base: Option<String>,
    /// New model (trimmed)
    pub llm_model: Option<String>,
    /// New LLM key (trimmed)
    pub llm_key: Option<String>,
    /// New search URL (trimmed)
    pub rag_url: Option<String>,
    /// New search token (trimmed)
    pub rag_token: Option<String>,
    /// New top-k
    pub top_k: Option<u32>,
    /// New retrieval switch
    pub use_rag: Option<bool>,
    /// New mode
    pub mode: Option<Mode>,
    /// New remember switch
    pub remember: Option<bool>,
    /// New context window
    pub max_context: Option<u32>,
    /// New output cap
    pub max_output: Option<u32>,
    /// New headroom
    pub headroom: Option<u32>,
}

impl SettingsUpdate {
    /// Decode an update from client JSON with the same leniency as stored sessions
    ///
    /// Present integer fields that are zero or unparsable reset to their default.
    pub fn from_value(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);
        let text = |key: &str| lenient_string(obj.get(key)).map(|s| s.trim().to_string());
        let int = |key: &str, default: u32| obj.get(key).map(|v| lenient_u32(Some(v), default));
        let flag = |key: &str| {
            obj.get(key)
                .filter(|v| !v.is_null())
                .map(|v| lenient_bool(Some(v), false))
        };
        Self {
            llm_base: text("llmBase"),
            llm_model: text("llmModel"),
            llm_key: text("llmKey"),
            rag_url: text("ragURL"),
            rag_token: text("ragToken"),
            top_k: int("topK", DEFAULT_TOP_K),
            use_rag: flag("useRAG"),
            mode: obj.get("mode").map(|v| lenient_mode(Some(v))),
            remember: flag("remember"),
            max_context: int("maxContext", DEFAULT_MAX_CONTEXT),
            max_output: int("maxOutput", DEFAULT_MAX_OUTPUT),
            headroom: int("headroom", DEFAULT_HEADROOM),
        }
    }

    fn apply(self, session: &mut Session) {
        if let Some(v) = self.llm_base {
            session.llm_base = v;
        }
        if let Some(v) = self.llm_model {
            session.llm_model = v;
        }
        if let Some(v) = self.llm_key {
            session.llm_key = v;
        }
        if let Some(v) = self.rag_url {
            session.rag_url = v;
        }
        if let Some(v) = self.rag_token {
            session.rag_token = v;
        }
        if let Some(v) = self.top_k {
            session.top_k = v;
        }
        if let Some(v) = self.use_rag {
            session.use_rag = v;
        }
        if let Some(v) = self.mode {
            session.mode = v;
        }
        if let Some(v) = self.remember {
            session.remember = v;
        }
        if let Some(v) = self.max_context {
            session.max_context = v;
        }
        if let Some(v) = self.max_output {
            session.max_output = v;
        }
        if let Some(v) = self.headroom {
            session.headroom = v;
        }
    }
}

/// Tab strip summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabsView {
    /// Tab labels
    pub names: Vec<String>,
    /// Model per tab
    pub models: Vec<String>,
    /// Active tab index
    pub active: usize,
}

fn lenient_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "y" | "t"
        ),
        _ => default,
    }
}

fn lenient_u32(value: Option<&Value>, default: u32) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .filter(|&n| n > 0)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(default)
}

fn lenient_mode(value: Option<&Value>) -> Mode {
    let code = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Mode::from_code(code.unwrap_or(0))
}

fn lenient_history(value: Option<&Value>) -> Vec<ChatMessage> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let role = ChatRole::parse(&lenient_string(obj.get("role")).unwrap_or_default())?;
            let content = lenient_string(obj.get("content")).unwrap_or_default();
            Some(ChatMessage { role, content })
        })
        .collect()
}

/// All tabs plus the active index, backed by a JSON file
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    sessions: Vec<Session>,
    active: usize,
}

impl SessionStore {
    /// Load the store at `path`
    ///
    /// Never fails: a missing file yields one default tab, and a corrupt
    /// file is logged and replaced by defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let (sessions, active) = match Self::read_root(&path) {
            Ok(Some(root)) => Self::from_root(&root),
            Ok(None) => (vec![Session::named("Tab 1")], 0),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Session store unreadable, starting fresh");
                (vec![Session::named("Tab 1")], 0)
            }
        };
        let store = Self {
            path,
            sessions,
            active,
        };
        if let Err(e) = store.save() {
            tracing::warn!(error = %e, "Failed to write session store");
        }
        store
    }

    fn read_root(path: &Path) -> Result<Option<Value>, PersistenceError> {
        if !path.exists() {
            return Ok(None);
        }
        let json =
            fs::read_to_string(path).map_err(|e| PersistenceError::Io(e.to_string()))?;
        let root: Value =
            serde_json::from_str(&json).map_err(|e| PersistenceError::Json(e.to_string()))?;
        if !root.is_object() {
            return Err(PersistenceError::InvalidData(
                "store root is not an object".to_string(),
            ));
        }
        Ok(Some(root))
    }

    fn from_root(root: &Value) -> (Vec<Session>, usize) {
        let Some(list) = root.get("sessions") else {
            // Legacy layout: a single flat settings object
            let mut session = Session::from_value(root);
            if session.name.trim().is_empty() {
                session.name = "Tab 1".to_string();
            }
            return (vec![session], 0);
        };

        let mut sessions: Vec<Session> = list
            .as_array()
            .map(|items| items.iter().map(Session::from_value).collect())
            .unwrap_or_default();
        if sessions.is_empty() {
            sessions.push(Session::named("Tab 1"));
        }
        for (i, session) in sessions.iter_mut().enumerate() {
            if session.name.trim().is_empty() {
                session.name = format!("Tab {}", i + 1);
            }
        }
        let active = root
            .get("active")
            .and_then(Value::as_u64)
            .map(|a| a as usize)
            .unwrap_or(0)
            .min(sessions.len() - 1);
        (sessions, active)
    }

    /// Write the whole store
    pub fn save(&self) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::Io(e.to_string()))?;
        }
        let payload = json!({
            "version": STORE_VERSION,
            "sessions": self.sessions,
            "active": self.active,
        });
        let json = serde_json::to_string_pretty(&payload)
            .map_err(|e| PersistenceError::Json(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| PersistenceError::Io(e.to_string()))?;
        Ok(())
    }

    /// Active session
    pub fn current(&self) -> &Session {
        &self.sessions[self.active]
    }

    /// Active tab index
    pub fn active(&self) -> usize {
        self.active
    }

    /// All sessions in tab order
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Tab strip summary
    pub fn tabs(&self) -> TabsView {
        TabsView {
            names: self
                .sessions
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    if s.name.is_empty() {
                        format!("Tab {}", i + 1)
                    } else {
                        s.name.clone()
                    }
                })
                .collect(),
            models: self.sessions.iter().map(|s| s.llm_model.clone()).collect(),
            active: self.active,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), AppError> {
        if index >= self.sessions.len() {
            return Err(AppError::TabNotFound(index));
        }
        Ok(())
    }

    /// Make tab `index` active
    pub fn switch_tab(&mut self, index: usize) -> Result<(), AppError> {
        self.check_index(index)?;
        self.active = index;
        self.save()?;
        Ok(())
    }

    /// Open a tab with the current settings and an empty history
    ///
    /// Returns the new tab's index, which becomes active.
    pub fn new_tab(&mut self) -> Result<usize, AppError> {
        let mut session = self.current().clone();
        session.id = Uuid::new_v4().to_string();
        session.history.clear();
        session.name = format!("Tab {}", self.sessions.len() + 1);
        self.sessions.push(session);
        self.active = self.sessions.len() - 1;
        self.save()?;
        Ok(self.active)
    }

    /// Close tab `index`
    ///
    /// The last remaining tab is kept and only has its history cleared.
    pub fn close_tab(&mut self, index: usize) -> Result<(), AppError> {
        self.check_index(index)?;
        if self.sessions.len() == 1 {
            self.sessions[0].history.clear();
        } else {
            self.sessions.remove(index);
            if index < self.active {
                self.active -= 1;
            }
            self.active = self.active.min(self.sessions.len() - 1);
        }
        self.save()?;
        Ok(())
    }

    /// Rename tab `index`
    pub fn rename_tab(&mut self, index: usize, name: &str) -> Result<(), AppError> {
        self.check_index(index)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest(
                "Tab name must not be empty".to_string(),
            ));
        }
        self.sessions[index].name = name.to_string();
        self.save()?;
        Ok(())
    }

    /// Clear the active tab's history
    pub fn new_chat(&mut self) -> Result<(), AppError> {
        self.sessions[self.active].history.clear();
        self.save()?;
        Ok(())
    }

    /// Apply a partial settings update to the active tab
    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<(), AppError> {
        update.apply(&mut self.sessions[self.active]);
        self.save()?;
        Ok(())
    }

    /// Append a question/answer pair to the session with `session_id`
    ///
    /// Returns `false` when nothing was recorded (tab closed meanwhile or
    /// `remember` off).
    pub fn record_exchange(
        &mut self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<bool, AppError> {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) else {
            tracing::debug!(session_id = %session_id, "Session closed before answer arrived");
            return Ok(false);
        };
        if !session.remember {
            return Ok(false);
        }
        session.history.push(ChatMessage::user(question));
        session.history.push(ChatMessage::assistant(answer));
        if session.history.len() > HISTORY_CAP {
            let excess = session.history.len() - HISTORY_CAP;
            session.history.drain(..excess);
        }
        self.save()?;
        Ok(true)
    }

    /// Store a detected context window on the session with `session_id`
    pub fn set_max_context(&mut self, session_id: &str, tokens: u32) -> Result<bool, AppError> {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) else {
            return Ok(false);
        };
        if tokens == 0 || session.max_context == tokens {
            return Ok(false);
        }
        session.max_context = tokens;
        self.save()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> SessionStore {
        SessionStore::load(dir.join("sessions.json"))
    }

    #[test]
    fn test_missing_file_creates_default_tab() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = store_in(dir.path());
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.current().name, "Tab 1");
        assert_eq!(store.current().top_k, 8);
        assert_eq!(store.current().mode, Mode::Auto);
        assert!(dir.path().join("sessions.json").exists());
    }

    #[test]
    fn test_lenient_session_decoding() {
        let value = json!({
            "name": "Kerning",
            "topK": "12",
            "useRAG": "no",
            "remember": 0,
            "mode": 7,
            "maxContext": 0,
            "maxOutput": null,
            "headroom": "abc",
            "history": [
                {"role": "user", "content": "hi"},
                {"role": "tool", "content": "dropped"},
                {"role": "assistant", "content": 42},
                "not an object"
            ]
        });
        let s = Session::from_value(&value);
        assert_eq!(s.name, "Kerning");
        assert_eq!(s.top_k, 12);
        assert!(!s.use_rag);
        assert!(!s.remember);
        assert_eq!(s.mode, Mode::Auto);
        assert_eq!(s.max_context, 20000);
        assert_eq!(s.max_output, 1024);
        assert_eq!(s.headroom, 512);
        assert_eq!(s.history.len(), 2);
        assert_eq!(s.history[1].content, "42");
        assert!(!s.id.is_empty());
    }

    #[test]
    fn test_bool_spellings() {
        for v in [json!(true), json!(1), json!("YES"), json!(" on "), json!("t")] {
            assert!(lenient_bool(Some(&v), false), "{} should be true", v);
        }
        for v in [json!(false), json!(0), json!("off"), json!("")] {
            assert!(!lenient_bool(Some(&v), true), "{} should be false", v);
        }
        assert!(lenient_bool(None, true));
    }

    #[test]
    fn test_legacy_flat_layout_is_migrated() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("sessions.json");
        fs::write(
            &path,
            r#"{"llmModel": "gpt-4o", "mode": 2, "history": [{"role": "user", "content": "q"}]}"#,
        )
        .unwrap();

        let store = SessionStore::load(&path);
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.current().name, "Tab 1");
        assert_eq!(store.current().llm_model, "gpt-4o");
        assert_eq!(store.current().mode, Mode::Hybrid);
        assert_eq!(store.current().history.len(), 1);

        let saved: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["version"], 1);
        assert_eq!(saved["sessions"][0]["llmModel"], "gpt-4o");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("sessions.json");
        fs::write(&path, "{ not json").unwrap();
        let store = SessionStore::load(&path);
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.current().name, "Tab 1");
    }

    #[test]
    fn test_persistence_errors() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("sessions.json");

        fs::write(&path, "{ not json").unwrap();
        let err = SessionStore::read_root(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Json(_)));
        assert!(err.to_string().starts_with("Session file is not valid JSON: "));

        fs::write(&path, "[1, 2]").unwrap();
        assert_eq!(
            SessionStore::read_root(&path).unwrap_err(),
            PersistenceError::InvalidData("store root is not an object".to_string())
        );

        // Parent "directory" is a regular file
        let blocked = SessionStore::load(path.join("nested").join("sessions.json"));
        let err = blocked.save().unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
        let status = AppError::from(err).into_response().status();
        assert_eq!(status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_names_and_active_are_repaired() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("sessions.json");
        fs::write(
            &path,
            r#"{"version": 1, "sessions": [{"name": "A"}, {"name": "  "}], "active": 9}"#,
        )
        .unwrap();
        let store = SessionStore::load(&path);
        assert_eq!(store.tabs().names, vec!["A", "Tab 2"]);
        assert_eq!(store.active(), 1);

        fs::write(&path, r#"{"sessions": [], "active": 0}"#).unwrap();
        let store = SessionStore::load(&path);
        assert_eq!(store.tabs().names, vec!["Tab 1"]);
    }

    #[test]
    fn test_new_tab_copies_settings_without_history() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = store_in(dir.path());
        store
            .update_settings(SettingsUpdate {
                llm_model: Some("gpt-4.1".to_string()),
                ..Default::default()
            })
            .unwrap();
        let first_id = store.current().id.clone();
        store.record_exchange(&first_id, "q", "a").unwrap();

        let idx = store.new_tab().unwrap();
        assert_eq!(idx, 1);
        assert_eq!(store.active(), 1);
        assert_eq!(store.current().name, "Tab 2");
        assert_eq!(store.current().llm_model, "gpt-4.1");
        assert!(store.current().history.is_empty());
        assert_ne!(store.current().id, first_id);
    }

    #[test]
    fn test_close_tab_keeps_active_session() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = store_in(dir.path());
        store.new_tab().unwrap();
        store.new_tab().unwrap();
        store.switch_tab(2).unwrap();
        let active_id = store.current().id.clone();

        store.close_tab(0).unwrap();
        assert_eq!(store.sessions().len(), 2);
        assert_eq!(store.active(), 1);
        assert_eq!(store.current().id, active_id);

        // Closing the active last tab moves to the new last one
        store.close_tab(1).unwrap();
        assert_eq!(store.active(), 0);
    }

    #[test]
    fn test_close_last_tab_only_clears_history() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = store_in(dir.path());
        let id = store.current().id.clone();
        store.record_exchange(&id, "q", "a").unwrap();

        store.close_tab(0).unwrap();
        assert_eq!(store.sessions().len(), 1);
        assert!(store.current().history.is_empty());
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = store_in(dir.path());
        match store.switch_tab(3).unwrap_err() {
            AppError::TabNotFound(3) => {}
            other => panic!("Expected TabNotFound error, got: {:?}", other),
        }
        assert!(store.close_tab(1).is_err());
        assert!(store.rename_tab(5, "x").is_err());
    }

    #[test]
    fn test_rename_tab_trims_and_rejects_blank() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = store_in(dir.path());
        store.rename_tab(0, "  Metrics  ").unwrap();
        assert_eq!(store.current().name, "Metrics");
        match store.rename_tab(0, "   ").unwrap_err() {
            AppError::InvalidRequest(_) => {}
            other => panic!("Expected InvalidRequest error, got: {:?}", other),
        }
    }

    #[test]
    fn test_history_is_capped() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = store_in(dir.path());
        let id = store.current().id.clone();
        for i in 0..45 {
            store
                .record_exchange(&id, &format!("q{}", i), &format!("a{}", i))
                .unwrap();
        }
        let history = &store.current().history;
        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history[0].content, "q5");
        assert_eq!(history[79].content, "a44");
    }

    #[test]
    fn test_remember_off_skips_recording() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut store = store_in(dir.path());
        store
            .update_settings(SettingsUpdate {
                remember: Some(false),
                ..Default::default()
            })
            .unwrap();
        let id = store.current().id.clone();
        assert!(!store.record_exchange(&id, "q", "a").unwrap());
        assert!(!store.record_exchange("gone", "q", "a").unwrap());
        assert!(store.current().history.is_empty());
    }

    #[test]
    fn test_settings_update_decoding() {
        let update = SettingsUpdate::from_value(&json!({
            "llmBase": "  https://api.openai.com/v1 ",
            "topK": 0,
            "useRAG": "false",
            "mode": "3",
            "maxOutput": "4096"
        }));
        assert_eq!(update.llm_base.as_deref(), Some("https://api.openai.com/v1"));
        assert_eq!(update.top_k, Some(8));
        assert_eq!(update.use_rag, Some(false));
        assert_eq!(update.mode, Some(Mode::Chat));
        assert_eq!(update.max_output, Some(4096));
        assert_eq!(update.llm_model, None);
        assert_eq!(update.remember, None);
    }

    #[test]
    fn test_store_survives_reload() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("sessions.json");
        {
            let mut store = SessionStore::load(&path);
            store.new_tab().unwrap();
            store.rename_tab(1, "Second").unwrap();
            let id = store.current().id.clone();
            store.set_max_context(&id, 131072).unwrap();
        }
        let store = SessionStore::load(&path);
        assert_eq!(store.active(), 1);
        assert_eq!(store.current().name, "Second");
        assert_eq!(store.current().max_context, 131072);
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let value = serde_json::to_value(Session::named("X")).unwrap();
        assert_eq!(value["ragURL"], DEFAULT_RAG_URL);
        assert_eq!(value["useRAG"], true);
        assert_eq!(value["maxContext"], 20000);
        assert_eq!(value["mode"], 0);
        assert!(value["history"].as_array().unwrap().is_empty());
    }
}
