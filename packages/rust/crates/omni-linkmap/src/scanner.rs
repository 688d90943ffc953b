//! Recursive, parallel note discovery.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{LinkMapError, Result};
use crate::identity::extension_of;
use crate::parser::{DocumentParser, ParsedDocument};

/// Default recognized note extensions.
pub const DEFAULT_FILE_TYPES: &[&str] = &["md"];

/// Outcome of one directory scan, merged into a store in one step.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Canonical scan root.
    pub root: PathBuf,
    /// Titled documents, sorted by id.
    pub documents: Vec<ParsedDocument>,
    /// Eligible files visited.
    pub file_count: usize,
    /// Files that could not be read.
    pub failed_count: usize,
}

/// Whether `path` has one of `file_types` as its extension (after the last dot).
#[must_use]
pub fn is_eligible_note(path: &Path, file_types: &[String]) -> bool {
    extension_of(path).is_some_and(|ext| file_types.iter().any(|allowed| *allowed == ext))
}

/// Whether any directory between `root` and `path` starts with a dot.
#[must_use]
pub fn is_in_hidden_dir(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    let Some(parent) = relative.parent() else {
        return false;
    };
    parent
        .components()
        .any(|component| component.as_os_str().to_string_lossy().starts_with('.'))
}

fn should_skip_entry(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

/// Collect every eligible note below `root`, skipping hidden directories.
#[must_use]
pub fn discover_notes(root: &Path, file_types: &[String]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !should_skip_entry(entry))
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_eligible_note(entry.path(), file_types))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Canonicalize and validate a scan root.
///
/// # Errors
/// `InvalidRoot` when the path does not exist or is not a directory.
pub fn canonical_root(root_dir: &Path) -> Result<PathBuf> {
    let root = root_dir
        .canonicalize()
        .map_err(|e| LinkMapError::InvalidRoot {
            path: root_dir.display().to_string(),
            reason: e.to_string(),
        })?;
    if !root.is_dir() {
        return Err(LinkMapError::InvalidRoot {
            path: root.display().to_string(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(root)
}

/// Scan `root_dir`, parsing all eligible notes concurrently.
///
/// A file that fails to read is logged and counted; it never aborts the scan.
///
/// # Errors
/// `InvalidRoot` when the root is unusable.
pub fn scan_directory(
    root_dir: &Path,
    file_types: &[String],
    parser: &DocumentParser,
) -> Result<ScanReport> {
    let root = canonical_root(root_dir)?;
    tracing::debug!(
        event = "linkmap.scan.started",
        root = %root.display(),
        file_types = ?file_types,
        "scanning notebook root"
    );

    let candidates = discover_notes(&root, file_types);
    let file_count = candidates.len();
    let outcomes: Vec<Result<Option<ParsedDocument>>> = candidates
        .par_iter()
        .map(|path| {
            parser.parse_file(path).inspect_err(|error| {
                tracing::warn!(
                    event = "linkmap.scan.parse_failed",
                    path = %path.display(),
                    error = %error,
                    "skipping unreadable note"
                );
            })
        })
        .collect();

    let failed_count = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    let mut documents: Vec<ParsedDocument> = outcomes
        .into_iter()
        .filter_map(|outcome| outcome.ok().flatten())
        .collect();
    documents.sort_by(|left, right| left.id.cmp(&right.id));

    tracing::info!(
        event = "linkmap.scan.completed",
        root = %root.display(),
        files = file_count,
        documents = documents.len(),
        failed = failed_count,
        "notebook scan completed"
    );
    Ok(ScanReport {
        root,
        documents,
        file_count,
        failed_count,
    })
}
