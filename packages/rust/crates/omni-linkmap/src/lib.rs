#![allow(clippy::doc_markdown)]

//! omni-linkmap - Incremental link graph for markdown notebooks
//!
//! Keeps an in-memory graph of interlinked notes synchronized with the file
//! system and projects it for a force-directed view with a focus mode.
//!
//! # Architecture
//!
//! ```text
//! omni-linkmap/src/
//! ├── lib.rs        # Re-exports (this file)
//! ├── error.rs      # LinkMapError enum
//! ├── identity.rs   # Path -> node id
//! ├── reader.rs     # Size-limited text reads, binary detection
//! ├── parser/       # comrak AST -> title + resolved links
//! ├── scanner.rs    # walkdir + rayon directory scan
//! ├── store.rs      # GraphStore, integrity and backlink passes
//! ├── reconciler.rs # GraphEvent application
//! ├── protocol.rs   # Refresh / intent / host messages
//! ├── export.rs     # DOT output
//! ├── config.rs     # Layered YAML settings
//! ├── watcher.rs    # notify -> GraphEvent
//! ├── session.rs    # Single-owner session actor
//! └── projector/    # Seeded layout, focus mode, click intents
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_linkmap::{DocumentParser, GraphStore, scan_directory};
//!
//! let report = scan_directory(root, &["md".to_string()], &DocumentParser::default())?;
//! let store = GraphStore::from_scan(report);
//! println!("{}", omni_linkmap::to_dot(&store));
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

mod config;
mod error;
mod export;
mod identity;
mod parser;
mod projector;
mod protocol;
mod reader;
mod reconciler;
mod scanner;
mod session;
mod store;
mod watcher;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use config::{
    DEFAULT_FILE_ID_REGEXP, LinkMapSettings, SETTINGS_SECTION, ViewColumn, find_file_id,
    set_linkmap_config_override,
};
pub use error::{LinkMapError, Result};
pub use export::to_dot;
pub use identity::{node_id, node_id_for};
pub use parser::{DocumentParser, ParsedDocument, SyntaxNode, parse_note, parse_syntax};
pub use projector::{
    ALPHA_DECAY, ALPHA_MIN, FOCUS_DEPTH, LAYOUT_SEED, LayoutEngine, MAX_ZOOM, MIN_ZOOM, Point,
    ProjectedEdge, ProjectedNode, Projection, RenderProjector, ViewMode, display_label,
    focus_set, tick_count,
};
pub use protocol::{
    ClickPayload, GraphSnapshot, HostRequest, NodePayload, SessionOutput, UiIntent,
    WebviewMessage,
};
pub use reader::{DEFAULT_MAX_NOTE_BYTES, is_binary, read_note_text, read_note_text_async};
pub use reconciler::{ChangeReconciler, GraphEvent};
pub use scanner::{
    DEFAULT_FILE_TYPES, ScanReport, canonical_root, discover_notes, is_eligible_note,
    scan_directory,
};
pub use session::{GraphSession, SessionInput};
pub use store::{GraphStore, Node};
pub use watcher::{DEFAULT_DEBOUNCE_MS, NoteFilter, NoteWatcher};
