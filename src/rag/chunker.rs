//! Corpus reading and chunking
//!
//! Splits source documents into overlapping fixed-size character windows
//! and derives a stable identifier for each chunk.

use sha1::{Digest, Sha1};
use std::path::Path;
use walkdir::WalkDir;

/// Default window size in characters
pub const DEFAULT_CHUNK_CHARS: usize = 1800;

/// Default overlap between consecutive windows in characters
pub const DEFAULT_OVERLAP_CHARS: usize = 200;

const ID_PREFIX_CHARS: usize = 64;
const ID_HEX_LEN: usize = 16;

/// A text file picked up from the corpus folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path as walked from the corpus root
    pub path: String,
    /// File contents (invalid UTF-8 dropped)
    pub text: String,
}

fn is_corpus_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

/// Read every `.md` / `.txt` file under `folder`, in sorted path order
///
/// Files that cannot be read are skipped with a warning.
pub fn read_corpus(folder: &Path) -> Vec<SourceDocument> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable corpus entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_corpus_file(entry.path()) {
            continue;
        }
        match std::fs::read(entry.path()) {
            Ok(bytes) => docs.push(SourceDocument {
                path: entry.path().display().to_string(),
                text: String::from_utf8_lossy(&bytes).replace('\u{FFFD}', ""),
            }),
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "Failed to read corpus file");
            }
        }
    }
    docs
}

/// Split `text` into windows of `max_chars` characters overlapping by `overlap`
///
/// Whitespace-only windows are dropped. The cursor always moves forward,
/// even when `overlap >= max_chars`.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut i = 0;

    while i < n {
        let j = (i + max_chars).min(n);
        chunks.push(chars[i..j].iter().collect::<String>());
        if j == n {
            break;
        }
        i = j.saturating_sub(overlap).max(i + 1);
    }

    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

/// Content-derived chunk id: SHA-1 of `"{path}::{first 64 chars}"`, 16 hex chars
pub fn chunk_id(path: &str, chunk: &str) -> String {
    let prefix: String = chunk.chars().take(ID_PREFIX_CHARS).collect();
    let digest = Sha1::digest(format!("{}::{}", path, prefix).as_bytes());
    let hex = format!("{:x}", digest);
    hex[..ID_HEX_LEN].to_string()
}
