//! Markdown note parsing for link-graph maintenance.

mod paths;
mod syntax;

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;
use crate::identity::{node_id, normalize_slashes};
use crate::reader::{DEFAULT_MAX_NOTE_BYTES, read_note_text, read_note_text_async};

use self::paths::{parent_directory, resolve_link_target};

pub use self::syntax::{SyntaxNode, parse_syntax};

/// Parsed note: identity, title and resolved outbound link ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Node id derived from `path`.
    pub id: String,
    /// Document path as given to the parser (slashes normalized).
    pub path: String,
    /// First level-1 heading text.
    pub title: String,
    /// Outbound node ids (deduplicated; a note may link to itself).
    pub links: BTreeSet<String>,
}

/// Parse note content already in memory.
///
/// Returns `None` when the document has no title; such a document never
/// becomes a node regardless of its links.
#[must_use]
pub fn parse_note(path: &Path, content: &str) -> Option<ParsedDocument> {
    let path = normalize_slashes(&path.to_string_lossy());
    let tree = parse_syntax(content);
    let title = tree.find_title()?;
    let id = node_id(&path);
    let parent = parent_directory(&path);
    let links: BTreeSet<String> = tree
        .find_links()
        .iter()
        .filter_map(|raw| resolve_link_target(raw, parent))
        .collect();
    Some(ParsedDocument {
        id,
        path,
        title,
        links,
    })
}

/// File-backed parser with a per-note read limit.
#[derive(Debug, Clone, Copy)]
pub struct DocumentParser {
    max_bytes: u64,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NOTE_BYTES)
    }
}

impl DocumentParser {
    /// Parser that refuses notes larger than `max_bytes`.
    #[must_use]
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Read and parse one note (blocking).
    ///
    /// # Errors
    /// Propagates read failures; a missing title is `Ok(None)`.
    pub fn parse_file(&self, path: &Path) -> Result<Option<ParsedDocument>> {
        let content = read_note_text(path, self.max_bytes)?;
        Ok(parse_note(path, &content))
    }

    /// Read and parse one note (async).
    ///
    /// # Errors
    /// Propagates read failures; a missing title is `Ok(None)`.
    pub async fn parse_file_async(&self, path: &Path) -> Result<Option<ParsedDocument>> {
        let content = read_note_text_async(path, self.max_bytes).await?;
        Ok(parse_note(path, &content))
    }
}
