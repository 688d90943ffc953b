//! Applies file-system events to a [`GraphStore`].
//!
//! Every event is applied to completion and yields the snapshots the session
//! must emit, in order. An event that changes nothing yields no snapshot.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::identity::{node_id, node_id_for, normalize_slashes};
use crate::parser::DocumentParser;
use crate::protocol::GraphSnapshot;
use crate::scanner::{DEFAULT_FILE_TYPES, is_eligible_note};
use crate::store::GraphStore;

/// Change notification for one or more documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "paths", rename_all = "lowercase")]
pub enum GraphEvent {
    /// File created or its content saved.
    Changed(PathBuf),
    /// File removed.
    Deleted(PathBuf),
    /// Batch of `(old, new)` moves; files or directories.
    Renamed(Vec<(PathBuf, PathBuf)>),
    /// Editor focus moved to a document.
    Opened(PathBuf),
}

/// Stateless event applier; the store is passed in by its owner.
#[derive(Debug, Clone)]
pub struct ChangeReconciler {
    parser: DocumentParser,
    file_types: Vec<String>,
}

impl Default for ChangeReconciler {
    fn default() -> Self {
        Self::new(
            DocumentParser::default(),
            DEFAULT_FILE_TYPES.iter().map(|ext| (*ext).to_string()).collect(),
        )
    }
}

fn path_string(path: &Path) -> String {
    normalize_slashes(&path.to_string_lossy())
}

impl ChangeReconciler {
    /// Reconciler accepting notes whose extension is in `file_types`.
    #[must_use]
    pub fn new(parser: DocumentParser, file_types: Vec<String>) -> Self {
        Self { parser, file_types }
    }

    /// Recognized extensions.
    #[must_use]
    pub fn file_types(&self) -> &[String] {
        &self.file_types
    }

    /// Apply one event and return the snapshots to emit.
    pub async fn apply(&self, store: &mut GraphStore, event: GraphEvent) -> Vec<GraphSnapshot> {
        let snapshots = match &event {
            GraphEvent::Changed(path) => self.apply_changed(store, path).await,
            GraphEvent::Deleted(path) => Self::apply_deleted(store, path),
            GraphEvent::Renamed(pairs) => pairs
                .iter()
                .map(|(old, new)| {
                    Self::apply_renamed(store, old, new);
                    store.snapshot()
                })
                .collect(),
            GraphEvent::Opened(path) => Self::apply_opened(store, path),
        };
        tracing::debug!(
            event = "linkmap.reconcile.applied",
            change = ?event,
            nodes = store.len(),
            snapshots = snapshots.len(),
            "graph event applied"
        );
        snapshots
    }

    async fn apply_changed(&self, store: &mut GraphStore, path: &Path) -> Vec<GraphSnapshot> {
        if !is_eligible_note(path, &self.file_types) {
            return Vec::new();
        }
        match self.parser.parse_file_async(path).await {
            Ok(Some(doc)) => store.upsert(doc),
            Ok(None) => {
                store.remove(&node_id_for(path));
            }
            Err(error) => {
                tracing::warn!(
                    event = "linkmap.reconcile.parse_failed",
                    path = %path.display(),
                    error = %error,
                    "dropping note that can no longer be read"
                );
                store.remove(&node_id_for(path));
            }
        }
        store.refresh_integrity();
        vec![store.snapshot()]
    }

    fn apply_deleted(store: &mut GraphStore, path: &Path) -> Vec<GraphSnapshot> {
        let id = node_id_for(path);
        if store.remove(&id).is_none() {
            return Vec::new();
        }
        store.strip_references(&id);
        vec![store.snapshot()]
    }

    fn apply_renamed(store: &mut GraphStore, old: &Path, new: &Path) {
        let old_path = path_string(old);
        let new_path = path_string(new);
        let old_id = node_id(&old_path);
        // Only a node stored under exactly `old` is a file move; a folder
        // note `notes.md` shares its id with the directory `notes/`.
        if store.get(&old_id).is_some_and(|node| node.path == old_path) {
            store.rename(&old_id, &node_id(&new_path), &new_path);
            return;
        }

        let prefix = format!("{}/", old_path.trim_end_matches('/'));
        let moved: Vec<(String, String)> = store
            .nodes()
            .filter_map(|node| {
                let rest = node.path.strip_prefix(&prefix)?;
                Some((node.id.clone(), format!("{}/{rest}", new_path.trim_end_matches('/'))))
            })
            .collect();
        if moved.is_empty() {
            if !store.contains(&old_id) {
                // Unknown id: still rewrite stale references.
                store.rename(&old_id, &node_id(&new_path), &new_path);
            }
            return;
        }
        for (id, path) in moved {
            store.rename(&id, &node_id(&path), &path);
        }
    }

    fn apply_opened(store: &mut GraphStore, path: &Path) -> Vec<GraphSnapshot> {
        let raw = path_string(path);
        let trimmed = raw.strip_suffix(".git").unwrap_or(&raw);
        store.set_current_node(Some(node_id(trimmed)));
        vec![store.snapshot()]
    }
}
