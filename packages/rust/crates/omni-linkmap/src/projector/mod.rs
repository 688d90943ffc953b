//! Render-side projection of refresh messages.
//!
//! A [`RenderProjector`] is the renderer's state for one panel: it positions
//! nodes, applies the view mode and turns clicks into intents.

mod focus;
mod layout;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::protocol::{GraphSnapshot, UiIntent, WebviewMessage};

pub use self::focus::{FOCUS_DEPTH, focus_set};
pub use self::layout::{ALPHA_DECAY, ALPHA_MIN, LAYOUT_SEED, LayoutEngine, Point, tick_count};

/// Smallest zoom factor.
pub const MIN_ZOOM: f64 = 0.2;
/// Largest zoom factor.
pub const MAX_ZOOM: f64 = 3.0;

/// Which nodes the renderer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Every node and edge.
    #[default]
    All,
    /// Only the current node's neighbourhood.
    Focus,
}

/// Positioned node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedNode {
    /// Node id.
    pub id: String,
    /// File path, sent back on click.
    pub path: String,
    /// Label as displayed (underscores removed).
    pub label: String,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Shown in the current view mode.
    pub visible: bool,
    /// This is the current node.
    pub active: bool,
}

/// Directed edge between two projected nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedEdge {
    /// Source id.
    pub source: String,
    /// Target id.
    pub target: String,
    /// Both endpoints are visible.
    pub visible: bool,
}

/// Result of one projection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    /// Active view mode.
    pub mode: ViewMode,
    /// Current zoom factor.
    pub zoom: f64,
    /// Current node id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_node: Option<String>,
    /// Camera target: position of the current node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<Point>,
    /// Nodes in id order.
    pub nodes: Vec<ProjectedNode>,
    /// Edges in source order.
    pub edges: Vec<ProjectedEdge>,
}

impl Projection {
    /// "files" counter.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// "connections" counter.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes shown in the current mode.
    pub fn visible_nodes(&self) -> impl Iterator<Item = &ProjectedNode> {
        self.nodes.iter().filter(|node| node.visible)
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ProjectedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Label text as rendered.
#[must_use]
pub fn display_label(label: &str) -> String {
    label.replace('_', "")
}

/// Renderer state for one panel.
#[derive(Debug, Clone)]
pub struct RenderProjector {
    mode: ViewMode,
    zoom: f64,
    layout: LayoutEngine,
    snapshot: GraphSnapshot,
    positions: HashMap<String, Point>,
}

impl Default for RenderProjector {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl RenderProjector {
    /// Projector for a `width` x `height` viewport, in [`ViewMode::All`].
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            mode: ViewMode::All,
            zoom: 1.0,
            layout: LayoutEngine::new(width, height),
            snapshot: GraphSnapshot::default(),
            positions: HashMap::new(),
        }
    }

    /// Intent the renderer sends once it is ready for data.
    #[must_use]
    pub fn ready(&self) -> UiIntent {
        UiIntent::Ready
    }

    /// Current view mode.
    #[must_use]
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Current zoom factor.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom factor, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = if zoom.is_nan() {
            1.0
        } else {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        };
        self.zoom
    }

    /// Resize the viewport; takes effect on the next layout.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.layout.resize(width, height);
    }

    /// Handle a message from the session.
    pub fn handle(&mut self, message: WebviewMessage) -> Projection {
        match message {
            WebviewMessage::Refresh(snapshot) => self.refresh(snapshot),
        }
    }

    /// Replace the graph, re-run the layout and project it.
    pub fn refresh(&mut self, snapshot: GraphSnapshot) -> Projection {
        self.snapshot = snapshot;
        self.relayout()
    }

    /// Switch view mode and re-project.
    pub fn set_mode(&mut self, mode: ViewMode) -> Projection {
        self.mode = mode;
        self.relayout()
    }

    /// Projection of the current state without moving anything.
    #[must_use]
    pub fn projection(&self) -> Projection {
        let visible: Option<BTreeSet<String>> = match self.mode {
            ViewMode::All => None,
            ViewMode::Focus => focus_set(
                &self.snapshot,
                self.snapshot.current_node.as_deref(),
                FOCUS_DEPTH,
            ),
        };
        let is_visible = &|id: &str| visible.as_ref().is_none_or(|set| set.contains(id));
        let current = self.snapshot.current_node.as_deref();

        let nodes = self
            .snapshot
            .adjacency_list
            .values()
            .map(|node| {
                let point = self
                    .positions
                    .get(&node.id)
                    .copied()
                    .unwrap_or(Point { x: 0.0, y: 0.0 });
                ProjectedNode {
                    id: node.id.clone(),
                    path: node.path.clone(),
                    label: display_label(&node.label),
                    x: point.x,
                    y: point.y,
                    visible: is_visible(&node.id),
                    active: current == Some(node.id.as_str()),
                }
            })
            .collect();
        let edges = self
            .snapshot
            .adjacency_list
            .values()
            .flat_map(|node| {
                node.links.iter().map(move |target| ProjectedEdge {
                    source: node.id.clone(),
                    target: target.clone(),
                    visible: is_visible(&node.id) && is_visible(target),
                })
            })
            .collect();
        let camera = current.and_then(|id| self.positions.get(id).copied());

        Projection {
            mode: self.mode,
            zoom: self.zoom,
            current_node: self.snapshot.current_node.clone(),
            camera,
            nodes,
            edges,
        }
    }

    /// Click on node `id`: a click intent carrying its path.
    #[must_use]
    pub fn click(&self, id: &str) -> Option<UiIntent> {
        self.snapshot
            .adjacency_list
            .get(id)
            .map(|node| UiIntent::click(node.path.clone()))
    }

    fn relayout(&mut self) -> Projection {
        let positions = self.layout.run(&self.snapshot, &self.positions);
        self.positions = positions.into_iter().collect();
        self.projection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped() {
        let mut projector = RenderProjector::default();
        assert!((projector.set_zoom(10.0) - MAX_ZOOM).abs() < f64::EPSILON);
        assert!((projector.set_zoom(0.01) - MIN_ZOOM).abs() < f64::EPSILON);
        assert!((projector.set_zoom(1.5) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn labels_drop_underscores() {
        assert_eq!(display_label("my_note__title"), "mynotetitle");
    }
}
