//! File-system notifications translated into [`GraphEvent`]s.
//!
//! Uses `notify` for cross-platform monitoring. Raw events are filtered to
//! eligible notes outside hidden directories, modify bursts are debounced per
//! path (first write reported at once, the last one once the path goes quiet),
//! and rename halves are paired into one move.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{LinkMapError, Result};
use crate::reconciler::GraphEvent;
use crate::scanner::{DEFAULT_FILE_TYPES, canonical_root, is_in_hidden_dir};

/// Default debounce window for repeated modify events on one path.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// How long a rename source waits for its destination before it counts as a delete.
const RENAME_PAIR_WINDOW: Duration = Duration::from_millis(500);

/// Decides which paths are notes worth reporting.
#[derive(Debug, Clone)]
pub struct NoteFilter {
    root: PathBuf,
    notes: GlobSet,
}

impl NoteFilter {
    /// Filter for `**/*.{file_types}` below `root`.
    ///
    /// # Errors
    /// `Config` when an extension produces an invalid glob.
    pub fn new(root: &Path, file_types: &[String]) -> Result<Self> {
        let pattern = match file_types {
            [] => format!("**/*.{}", DEFAULT_FILE_TYPES.join(",")),
            [single] => format!("**/*.{single}"),
            many => format!("**/*.{{{}}}", many.join(",")),
        };
        let glob = Glob::new(&pattern)
            .map_err(|e| LinkMapError::Config(format!("invalid note glob '{pattern}': {e}")))?;
        let mut builder = GlobSetBuilder::new();
        builder.add(glob);
        let notes = builder
            .build()
            .map_err(|e| LinkMapError::Config(format!("invalid note glob '{pattern}': {e}")))?;
        Ok(Self {
            root: root.to_path_buf(),
            notes,
        })
    }

    /// Whether `path` lies inside a dot directory below the root.
    #[must_use]
    pub fn is_hidden(&self, path: &Path) -> bool {
        is_in_hidden_dir(path, &self.root)
    }

    /// Whether `path` is an eligible note outside hidden directories.
    #[must_use]
    pub fn is_note(&self, path: &Path) -> bool {
        !self.is_hidden(path) && self.notes.is_match(path)
    }
}

/// Modify burst on one path: `dirty` once a second modify arrives inside the window.
#[derive(Debug, Clone, Copy)]
struct ModifyBurst {
    last: Instant,
    dirty: bool,
}

#[derive(Debug)]
struct PendingFrom {
    tracker: Option<usize>,
    path: PathBuf,
    seen: Instant,
}

/// Stateful translation of raw `notify` events.
#[derive(Debug)]
pub(crate) struct EventTranslator {
    filter: NoteFilter,
    debounce: Duration,
    bursts: HashMap<PathBuf, ModifyBurst>,
    pending_from: Vec<PendingFrom>,
    paired: Vec<(usize, Instant)>,
}

impl EventTranslator {
    pub(crate) fn new(filter: NoteFilter, debounce: Duration) -> Self {
        Self {
            filter,
            debounce,
            bursts: HashMap::new(),
            pending_from: Vec::new(),
            paired: Vec::new(),
        }
    }

    pub(crate) fn translate(&mut self, event: &Event, now: Instant) -> Vec<GraphEvent> {
        let Some(first) = event.paths.first() else {
            return Vec::new();
        };
        match event.kind {
            EventKind::Create(_) => {
                if self.filter.is_note(first) {
                    self.bursts.insert(
                        first.clone(),
                        ModifyBurst {
                            last: now,
                            dirty: false,
                        },
                    );
                }
                self.changed(first)
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                self.bursts.remove(first);
                if !self.filter.is_hidden(first) {
                    self.pending_from.push(PendingFrom {
                        tracker: event.tracker(),
                        path: first.clone(),
                        seen: now,
                    });
                }
                Vec::new()
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                match self.take_pending(event.tracker()) {
                    Some(old) => {
                        if let Some(tracker) = event.tracker() {
                            self.paired.push((tracker, now));
                        }
                        self.classify_rename(old, first.clone())
                    }
                    None => self.changed(first),
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let Some(tracker) = event.tracker()
                    && let Some(idx) = self.paired.iter().position(|(t, _)| *t == tracker)
                {
                    self.paired.remove(idx);
                    return Vec::new();
                }
                let Some(second) = event.paths.get(1) else {
                    return Vec::new();
                };
                self.pending_from.retain(|pending| pending.path != *first);
                self.classify_rename(first.clone(), second.clone())
            }
            EventKind::Modify(ModifyKind::Name(_)) => {
                if first.exists() {
                    self.changed(first)
                } else {
                    self.deleted(first)
                }
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
            EventKind::Modify(_) => {
                if !self.filter.is_note(first) {
                    return Vec::new();
                }
                if let Some(burst) = self.bursts.get_mut(first)
                    && now.duration_since(burst.last) < self.debounce
                {
                    // Reported on the trailing edge by `flush_expired`.
                    burst.last = now;
                    burst.dirty = true;
                    return Vec::new();
                }
                self.bursts.insert(
                    first.clone(),
                    ModifyBurst {
                        last: now,
                        dirty: false,
                    },
                );
                vec![GraphEvent::Changed(first.clone())]
            }
            EventKind::Remove(_) => {
                self.bursts.remove(first);
                self.deleted(first)
            }
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
        }
    }

    /// Time-driven output.
    ///
    /// Modify bursts quiet for the debounce window report their last write,
    /// and unpaired rename sources older than the pairing window become
    /// deletes.
    pub(crate) fn flush_expired(&mut self, now: Instant) -> Vec<GraphEvent> {
        let debounce = self.debounce;
        let mut settled = Vec::new();
        self.bursts.retain(|path, burst| {
            if now.duration_since(burst.last) < debounce {
                return true;
            }
            if burst.dirty {
                settled.push(path.clone());
            }
            false
        });
        settled.sort();
        let mut outgoing: Vec<GraphEvent> =
            settled.into_iter().map(GraphEvent::Changed).collect();

        self.paired
            .retain(|(_, seen)| now.duration_since(*seen) < RENAME_PAIR_WINDOW);
        let (expired, waiting): (Vec<_>, Vec<_>) = self
            .pending_from
            .drain(..)
            .partition(|pending| now.duration_since(pending.seen) >= RENAME_PAIR_WINDOW);
        self.pending_from = waiting;
        outgoing.extend(
            expired
                .into_iter()
                .flat_map(|pending| self.deleted(&pending.path)),
        );
        outgoing
    }

    fn take_pending(&mut self, tracker: Option<usize>) -> Option<PathBuf> {
        let idx = match tracker {
            Some(tracker) => self
                .pending_from
                .iter()
                .position(|pending| pending.tracker == Some(tracker)),
            None => self
                .pending_from
                .iter()
                .position(|pending| pending.tracker.is_none()),
        }?;
        Some(self.pending_from.remove(idx).path)
    }

    fn changed(&self, path: &Path) -> Vec<GraphEvent> {
        if self.filter.is_note(path) {
            vec![GraphEvent::Changed(path.to_path_buf())]
        } else {
            Vec::new()
        }
    }

    fn deleted(&self, path: &Path) -> Vec<GraphEvent> {
        if self.filter.is_note(path) {
            vec![GraphEvent::Deleted(path.to_path_buf())]
        } else {
            Vec::new()
        }
    }

    fn classify_rename(&self, old: PathBuf, new: PathBuf) -> Vec<GraphEvent> {
        match (self.filter.is_note(&old), self.filter.is_note(&new)) {
            (true, true) => vec![GraphEvent::Renamed(vec![(old, new)])],
            (false, true) => vec![GraphEvent::Changed(new)],
            (true, false) => vec![GraphEvent::Deleted(old)],
            (false, false) => {
                if new.is_dir() && !self.filter.is_hidden(&new) && !self.filter.is_hidden(&old) {
                    vec![GraphEvent::Renamed(vec![(old, new)])]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

/// Recursive watch on a notebook root.
///
/// Dropping the watcher (or calling [`NoteWatcher::stop`]) ends the
/// translator task and releases the OS watch.
#[derive(Debug)]
pub struct NoteWatcher {
    root: PathBuf,
    stop_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl NoteWatcher {
    /// Start watching `root`, forwarding translated events into `sink`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// `InvalidRoot` for an unusable root, `Watcher` when the OS watch fails,
    /// `Config` for an invalid extension list.
    pub fn start<T>(
        root: &Path,
        file_types: &[String],
        debounce: Duration,
        sink: mpsc::Sender<T>,
    ) -> Result<Self>
    where
        T: From<GraphEvent> + Send + 'static,
    {
        let root = canonical_root(root)?;
        let filter = NoteFilter::new(&root, file_types)?;

        let (raw_tx, mut raw_rx) = mpsc::channel(256);
        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| {
                let _ = raw_tx.blocking_send(result);
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let tick = debounce.max(Duration::from_millis(10));
        let task = tokio::spawn(async move {
            // Keep the OS watch alive for the lifetime of the task.
            let _watcher = watcher;
            let mut translator = EventTranslator::new(filter, debounce);
            let mut ticker = tokio::time::interval(tick);

            'watch: loop {
                let outgoing = tokio::select! {
                    _ = stop_rx.recv() => break,
                    _ = ticker.tick() => translator.flush_expired(Instant::now()),
                    received = raw_rx.recv() => match received {
                        Some(Ok(event)) => translator.translate(&event, Instant::now()),
                        Some(Err(error)) => {
                            tracing::warn!(
                                event = "linkmap.watch.error",
                                error = %error,
                                "file watcher reported an error"
                            );
                            continue;
                        }
                        None => break,
                    },
                };
                for event in outgoing {
                    if sink.send(T::from(event)).await.is_err() {
                        break 'watch;
                    }
                }
            }
            tracing::debug!(event = "linkmap.watch.stopped", "file watcher stopped");
        });

        tracing::info!(
            event = "linkmap.watch.started",
            root = %root.display(),
            "watching notebook root"
        );
        Ok(Self {
            root,
            stop_tx,
            task: Some(task),
        })
    }

    /// Watched (canonical) root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop the translator and wait until the OS watch is released.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(()).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for NoteWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
