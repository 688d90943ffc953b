//! In-memory adjacency store for the note graph.
//!
//! Outbound links and derived backlinks are kept as separate sets. The wire
//! payload folds them into one symmetric `links` list (see [`GraphStore::snapshot`]).

use std::collections::{BTreeMap, BTreeSet};

use crate::parser::ParsedDocument;
use crate::protocol::{GraphSnapshot, NodePayload};
use crate::scanner::ScanReport;

/// One titled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Stable id (extension-stripped path).
    pub id: String,
    /// Current file path.
    pub path: String,
    /// Document title.
    pub label: String,
    /// Outbound node ids parsed from the document.
    pub links: BTreeSet<String>,
    /// Inbound node ids derived from other nodes' `links`.
    pub backlinks: BTreeSet<String>,
}

impl Node {
    fn from_parsed(doc: ParsedDocument) -> Self {
        Self {
            id: doc.id,
            path: doc.path,
            label: doc.title,
            links: doc.links,
            backlinks: BTreeSet::new(),
        }
    }

    /// Symmetric neighbour set: outbound ∪ inbound.
    #[must_use]
    pub fn neighbors(&self) -> BTreeSet<String> {
        self.links.union(&self.backlinks).cloned().collect()
    }

    fn replace_reference(&mut self, old_id: &str, new_id: &str) {
        if self.links.remove(old_id) {
            self.links.insert(new_id.to_string());
        }
        if self.backlinks.remove(old_id) {
            self.backlinks.insert(new_id.to_string());
        }
    }
}

/// Mapping from node id to [`Node`] plus the currently focused document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStore {
    nodes: BTreeMap<String, Node>,
    current_node: Option<String>,
}

impl GraphStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store built from a completed scan, with both integrity passes applied.
    #[must_use]
    pub fn from_scan(report: ScanReport) -> Self {
        let mut store = Self::new();
        store.merge_documents(report.documents);
        store.refresh_integrity();
        store
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether `id` is a key.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Currently focused node id, if any.
    #[must_use]
    pub fn current_node(&self) -> Option<&str> {
        self.current_node.as_deref()
    }

    /// Set (or clear) the focused node id. Does not touch the graph.
    pub fn set_current_node(&mut self, id: Option<String>) {
        self.current_node = id;
    }

    /// Number of outbound edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.links.len()).sum()
    }

    /// Insert or update a node from a parse result.
    ///
    /// An existing node keeps its backlinks until the next derivation pass.
    pub fn upsert(&mut self, doc: ParsedDocument) {
        match self.nodes.get_mut(&doc.id) {
            Some(node) => {
                node.path = doc.path;
                node.label = doc.title;
                node.links = doc.links;
            }
            None => {
                self.nodes.insert(doc.id.clone(), Node::from_parsed(doc));
            }
        }
    }

    /// Upsert every document of a batch (passes are left to the caller).
    pub fn merge_documents(&mut self, documents: Vec<ParsedDocument>) {
        for doc in documents {
            self.upsert(doc);
        }
    }

    /// Remove a node without touching references to it.
    pub fn remove(&mut self, id: &str) -> Option<Node> {
        self.nodes.remove(id)
    }

    /// Strip `id` from every node's `links` and `backlinks`.
    pub fn strip_references(&mut self, id: &str) {
        for node in self.nodes.values_mut() {
            node.links.remove(id);
            node.backlinks.remove(id);
        }
    }

    /// Move the node keyed `old_id` to `new_id` and rewrite references.
    ///
    /// References are rewritten even when no node exists under `old_id`.
    /// Returns whether a node was moved.
    pub fn rename(&mut self, old_id: &str, new_id: &str, new_path: &str) -> bool {
        let moved = match self.nodes.remove(old_id) {
            Some(mut node) => {
                node.id = new_id.to_string();
                node.path = new_path.to_string();
                self.nodes.insert(new_id.to_string(), node);
                true
            }
            None => false,
        };
        if old_id != new_id {
            for node in self.nodes.values_mut() {
                node.replace_reference(old_id, new_id);
            }
            if self.current_node.as_deref() == Some(old_id) && moved {
                self.current_node = Some(new_id.to_string());
            }
        }
        moved
    }

    /// Edge-integrity pass: drop references to ids that are not keys.
    pub fn prune_dangling_links(&mut self) {
        let keys: BTreeSet<String> = self.nodes.keys().cloned().collect();
        for node in self.nodes.values_mut() {
            node.links.retain(|id| keys.contains(id));
            node.backlinks.retain(|id| keys.contains(id));
        }
    }

    /// Backlink-derivation pass: recompute every `backlinks` set from `links`.
    ///
    /// Assumes the edge-integrity pass ran first; unknown targets are ignored.
    pub fn derive_backlinks(&mut self) {
        let mut inbound: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for node in self.nodes.values() {
            for target in &node.links {
                inbound
                    .entry(target.clone())
                    .or_default()
                    .insert(node.id.clone());
            }
        }
        for (id, node) in &mut self.nodes {
            node.backlinks = inbound.remove(id).unwrap_or_default();
        }
    }

    /// Edge-integrity pass followed by backlink derivation.
    pub fn refresh_integrity(&mut self) {
        self.prune_dangling_links();
        self.derive_backlinks();
    }

    /// Serializable view with links folded into a symmetric neighbour list.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let adjacency_list = self
            .nodes
            .iter()
            .map(|(id, node)| {
                (
                    id.clone(),
                    NodePayload {
                        id: node.id.clone(),
                        path: node.path.clone(),
                        label: node.label.clone(),
                        links: node.neighbors().into_iter().collect(),
                        backlinks: node.backlinks.iter().cloned().collect(),
                    },
                )
            })
            .collect();
        GraphSnapshot {
            adjacency_list,
            current_node: self.current_node.clone(),
        }
    }
}
