//! Wire messages exchanged between the graph session, the renderer and the host.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One node as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePayload {
    /// Node id.
    pub id: String,
    /// Current file path.
    pub path: String,
    /// Title.
    pub label: String,
    /// Symmetric neighbour ids (outbound ∪ inbound).
    pub links: Vec<String>,
    /// Inbound ids.
    #[serde(default)]
    pub backlinks: Vec<String>,
}

/// Full graph state carried by a refresh message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    /// Node id to payload.
    pub adjacency_list: BTreeMap<String, NodePayload>,
    /// Focused node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node: Option<String>,
}

impl GraphSnapshot {
    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adjacency_list.len()
    }

    /// Wrap into the renderer message.
    #[must_use]
    pub fn into_message(self) -> WebviewMessage {
        WebviewMessage::Refresh(self)
    }
}

/// Messages sent to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum WebviewMessage {
    /// Replace the rendered graph.
    Refresh(GraphSnapshot),
}

/// Payload of a click intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickPayload {
    /// File path of the clicked node.
    pub path: String,
}

/// Intents sent by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum UiIntent {
    /// Renderer finished loading and wants the current graph.
    Ready,
    /// A node was clicked.
    Click(ClickPayload),
}

impl UiIntent {
    /// Click intent for `path`.
    #[must_use]
    pub fn click(path: impl Into<String>) -> Self {
        Self::Click(ClickPayload { path: path.into() })
    }
}

/// Requests addressed to the editor host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostRequest {
    /// Open a document in the given view column.
    #[serde(rename_all = "camelCase")]
    OpenDocument {
        /// Document path.
        path: String,
        /// Host view column value (`-1` active, `-2` beside, `1..9`).
        column: i8,
    },
}

/// Everything a session emits, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionOutput {
    /// Message for the renderer.
    Webview(WebviewMessage),
    /// Request for the host.
    Host(HostRequest),
}

impl SessionOutput {
    /// Snapshot carried by a refresh, if this is one.
    #[must_use]
    pub fn as_snapshot(&self) -> Option<&GraphSnapshot> {
        match self {
            Self::Webview(WebviewMessage::Refresh(snapshot)) => Some(snapshot),
            Self::Host(_) => None,
        }
    }
}

impl From<GraphSnapshot> for SessionOutput {
    fn from(snapshot: GraphSnapshot) -> Self {
        Self::Webview(snapshot.into_message())
    }
}
