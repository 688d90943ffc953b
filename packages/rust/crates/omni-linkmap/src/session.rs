//! Single-owner graph session.
//!
//! One tokio task owns the [`GraphStore`] and handles file events, UI intents
//! and queries strictly in arrival order. Outbound messages are emitted
//! before the next input is read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::LinkMapSettings;
use crate::error::{LinkMapError, Result};
use crate::identity::node_id_for;
use crate::parser::DocumentParser;
use crate::protocol::{ClickPayload, GraphSnapshot, HostRequest, SessionOutput, UiIntent};
use crate::reconciler::{ChangeReconciler, GraphEvent};
use crate::scanner::{canonical_root, scan_directory};
use crate::store::GraphStore;
use crate::watcher::{DEFAULT_DEBOUNCE_MS, NoteWatcher};

const COMMAND_BUFFER: usize = 256;

/// Inbound message for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// File-system or editor event.
    File(GraphEvent),
    /// Renderer intent.
    Ui(UiIntent),
}

impl From<GraphEvent> for SessionInput {
    fn from(event: GraphEvent) -> Self {
        Self::File(event)
    }
}

impl From<UiIntent> for SessionInput {
    fn from(intent: UiIntent) -> Self {
        Self::Ui(intent)
    }
}

#[derive(Debug)]
enum Command {
    Input(SessionInput),
    Snapshot(oneshot::Sender<GraphSnapshot>),
    Close,
}

impl From<GraphEvent> for Command {
    fn from(event: GraphEvent) -> Self {
        Self::Input(SessionInput::File(event))
    }
}

struct SessionActor {
    store: GraphStore,
    reconciler: ChangeReconciler,
    open_column: i8,
    outputs: mpsc::UnboundedSender<SessionOutput>,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Input(SessionInput::File(event)) => {
                    for snapshot in self.reconciler.apply(&mut self.store, event).await {
                        self.emit(snapshot.into());
                    }
                }
                Command::Input(SessionInput::Ui(UiIntent::Ready)) => {
                    self.emit(self.store.snapshot().into());
                }
                Command::Input(SessionInput::Ui(UiIntent::Click(ClickPayload { path }))) => {
                    self.emit(SessionOutput::Host(HostRequest::OpenDocument {
                        path,
                        column: self.open_column,
                    }));
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.store.snapshot());
                }
                Command::Close => break,
            }
        }
        tracing::info!(
            event = "linkmap.session.closed",
            nodes = self.store.len(),
            "graph session closed"
        );
    }

    fn emit(&self, output: SessionOutput) {
        if self.outputs.send(output).is_err() {
            tracing::debug!(
                event = "linkmap.session.output_dropped",
                "no receiver for session output"
            );
        }
    }
}

fn resolve_document_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Live graph over one notebook root.
#[derive(Debug)]
pub struct GraphSession {
    root: PathBuf,
    commands: mpsc::Sender<Command>,
    watcher: Option<NoteWatcher>,
    actor: Option<JoinHandle<()>>,
}

impl GraphSession {
    /// Scan `root`, build the graph and start the session actor.
    ///
    /// Returns the session and the receiver of everything it emits.
    ///
    /// # Errors
    /// `NoRootDirectory` when `root` is `None`, `InvalidRoot` for an unusable
    /// root, `Watcher` when `watch` is set and the watch cannot be attached.
    pub async fn open(
        settings: &LinkMapSettings,
        root: Option<&Path>,
        active_document: Option<&Path>,
        watch: bool,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionOutput>)> {
        let root = canonical_root(root.ok_or(LinkMapError::NoRootDirectory)?)?;
        let parser = DocumentParser::default();
        let file_types = settings.file_types.clone();

        let scan_root = root.clone();
        let scan_types = file_types.clone();
        let report = tokio::task::spawn_blocking(move || {
            scan_directory(&scan_root, &scan_types, &parser)
        })
        .await
        .map_err(|e| LinkMapError::System(std::io::Error::other(e)))??;

        let mut store = GraphStore::from_scan(report);
        if let Some(active) = active_document {
            let id = node_id_for(&resolve_document_path(active));
            if store.contains(&id) {
                store.set_current_node(Some(id));
            }
        }

        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let actor = SessionActor {
            store,
            reconciler: ChangeReconciler::new(parser, file_types.clone()),
            open_column: settings.open_column.host_value(),
            outputs: output_tx,
        };
        tracing::info!(
            event = "linkmap.session.opened",
            root = %root.display(),
            nodes = actor.store.len(),
            current = ?actor.store.current_node(),
            watch,
            "graph session opened"
        );
        let actor = tokio::spawn(actor.run(command_rx));

        let watcher = if watch {
            Some(NoteWatcher::start(
                &root,
                &file_types,
                Duration::from_millis(DEFAULT_DEBOUNCE_MS),
                commands.clone(),
            )?)
        } else {
            None
        };

        Ok((
            Self {
                root,
                commands,
                watcher,
                actor: Some(actor),
            },
            output_rx,
        ))
    }

    /// Canonical notebook root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a file watcher feeds this session.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Queue one input; it is applied after everything queued before it.
    ///
    /// # Errors
    /// `SessionClosed` when the actor is gone.
    pub async fn send(&self, input: impl Into<SessionInput>) -> Result<()> {
        self.commands
            .send(Command::Input(input.into()))
            .await
            .map_err(|_| LinkMapError::SessionClosed)
    }

    /// Current graph state, observed after all previously queued inputs.
    ///
    /// # Errors
    /// `SessionClosed` when the actor is gone.
    pub async fn snapshot(&self) -> Result<GraphSnapshot> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| LinkMapError::SessionClosed)?;
        response.await.map_err(|_| LinkMapError::SessionClosed)
    }

    /// Stop the watcher, let the actor finish queued inputs, and wait for it.
    ///
    /// # Errors
    /// `System` when the actor task panicked.
    pub async fn close(mut self) -> Result<()> {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop().await;
        }
        let _ = self.commands.send(Command::Close).await;
        if let Some(actor) = self.actor.take() {
            actor
                .await
                .map_err(|e| LinkMapError::System(std::io::Error::other(e)))?;
        }
        Ok(())
    }
}
