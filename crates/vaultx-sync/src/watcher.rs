//! Replica directory watching
//!
//! [`FileWatcher`] wraps `notify` to observe the replica directories and
//! forwards simplified [`ChangeEvent`]s on a channel. [`DebouncedChangeQueue`]
//! coalesces those events per **file name**: the same blob changing in two
//! replicas is one pending entry, while different blobs never delay each
//! other.
//!
//! ```text
//! inotify ─► FileWatcher ─► mpsc ─► DebouncedChangeQueue ─► MirrorWatcher loop
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Suffix of in-flight copies written by the mirror and the vault directory
const TEMP_SUFFIX: &str = ".tmp";

/// A filesystem change inside a watched directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    /// A rename inside the directory; `new` is the resulting path
    Renamed { old: PathBuf, new: PathBuf },
}

impl ChangeEvent {
    /// The path the event leaves behind (the destination for renames)
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) | ChangeEvent::Deleted(p) => p,
            ChangeEvent::Renamed { new, .. } => new,
        }
    }

    /// Blob name the event concerns, if it names a regular blob
    ///
    /// In-flight `.tmp` files are not blobs and yield `None`.
    pub fn file_name(&self) -> Option<&str> {
        let name = self.path().file_name()?.to_str()?;
        if name.ends_with(TEMP_SUFFIX) {
            return None;
        }
        Some(name)
    }
}

// ============================================================================
// FileWatcher
// ============================================================================

/// OS-level watcher over a set of flat replica directories
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl FileWatcher {
    /// Creates the watcher and the receiver its events are delivered on
    ///
    /// # Errors
    /// Returns an error if the OS watcher cannot be created
    pub fn new() -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let (tx, rx) = mpsc::channel::<ChangeEvent>(1024);

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(change) = map_notify_event(&event) {
                        if tx.blocking_send(change).is_err() {
                            debug!("Change receiver dropped");
                        }
                    }
                }
                Err(err) => error!(error = %err, "File watcher error"),
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        Ok((
            Self {
                watcher,
                watched: Vec::new(),
            },
            rx,
        ))
    }

    /// Watches `dir` non-recursively, creating it first when missing
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or watched
    pub fn watch(&mut self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch path: {}", dir.display()))?;
        info!(path = %dir.display(), "Watching replica directory");
        self.watched.push(dir.to_path_buf());
        Ok(())
    }

    /// Stops watching every directory
    pub fn unwatch_all(&mut self) {
        for dir in self.watched.drain(..) {
            if let Err(e) = self.watcher.unwatch(&dir) {
                warn!(path = %dir.display(), error = %e, "Failed to unwatch directory");
            }
        }
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

/// Converts a raw `notify` event; access events and pathless events are
/// dropped
fn map_notify_event(event: &notify::Event) -> Option<ChangeEvent> {
    let paths = &event.paths;
    match &event.kind {
        EventKind::Create(_) => Some(ChangeEvent::Created(paths.first()?.clone())),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            Some(ChangeEvent::Renamed {
                old: paths[0].clone(),
                new: paths[1].clone(),
            })
        }
        EventKind::Modify(_) => Some(ChangeEvent::Modified(paths.first()?.clone())),
        EventKind::Remove(_) => Some(ChangeEvent::Deleted(paths.first()?.clone())),
        _ => None,
    }
}

// ============================================================================
// DebouncedChangeQueue
// ============================================================================

/// Per-name debounce window
///
/// Every push for a name restarts that name's window; a name is released by
/// [`poll`](DebouncedChangeQueue::poll) once it has been quiet for the full
/// delay.
pub struct DebouncedChangeQueue {
    pending: HashMap<String, Instant>,
    delay: Duration,
}

impl DebouncedChangeQueue {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            delay,
        }
    }

    /// Records a change; returns `false` when the event names no blob
    pub fn push(&mut self, event: &ChangeEvent) -> bool {
        let Some(name) = event.file_name() else {
            return false;
        };
        debug!(name, ?event, "Change queued");
        self.pending.insert(name.to_string(), Instant::now());
        true
    }

    /// Removes and returns the names whose window has elapsed, sorted
    pub fn poll(&mut self) -> Vec<String> {
        let now = Instant::now();
        let delay = self.delay;
        let mut settled: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, at)| now.duration_since(**at) >= delay)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &settled {
            self.pending.remove(name);
        }
        settled.sort();
        settled
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
