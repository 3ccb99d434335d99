//! Watch-mode event loop for the directory mirror
//!
//! [`MirrorWatcher::start`] spawns a task that owns a
//! [`FileWatcher`] over every replica directory and a
//! [`DebouncedChangeQueue`]. Settled names are mirrored one at a time and
//! the result is reported as a [`MirrorEvent`]:
//!
//! ```text
//! FileWatcher ──► change_rx ──► queue.push
//!                                   │  (poll_interval tick)
//!                                   ▼
//!                  DirectoryMirror::sync_by_encrypted_name ──► MirrorEvent
//! ```
//!
//! A failed file never ends the loop. The loop ends on [`MirrorWatcher::stop`]
//! or when the event receiver is dropped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vaultx_core::config::MirrorConfig;

use crate::mirror::{DirectoryMirror, MirrorOutcome};
use crate::watcher::{DebouncedChangeQueue, FileWatcher};

/// Timing of the watch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Quiet period per file name before it is mirrored
    pub debounce: Duration,
    /// How often settled names are collected
    pub poll_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl From<&MirrorConfig> for WatchOptions {
    fn from(config: &MirrorConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        }
    }
}

/// Result of handling one settled file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MirrorEvent {
    /// A tracked blob was reconciled (possibly with nothing to copy)
    Synced { file: String, outcome: MirrorOutcome },
    /// Mirroring the blob failed
    Error { file: String, error: String },
}

/// Handle to a running watch loop
pub struct MirrorWatcher {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MirrorWatcher {
    /// Watches every directory of `mirror` and starts the loop
    ///
    /// Missing directories are created. Must be called from within a tokio
    /// runtime.
    ///
    /// # Errors
    /// Returns an error if the OS watcher cannot be created or a directory
    /// cannot be watched
    pub fn start(
        mirror: Arc<DirectoryMirror>,
        options: WatchOptions,
    ) -> Result<(Self, mpsc::Receiver<MirrorEvent>)> {
        let (mut watcher, change_rx) = FileWatcher::new()?;
        for dir in mirror.directories() {
            watcher.watch(dir)?;
        }

        let (events_tx, events_rx) = mpsc::channel(256);
        let cancel = CancellationToken::new();

        info!(
            directories = mirror.directories().len(),
            debounce_ms = options.debounce.as_millis() as u64,
            "Starting mirror watch"
        );

        let task = tokio::spawn(run_loop(
            mirror,
            watcher,
            change_rx,
            events_tx,
            options,
            cancel.clone(),
        ));

        Ok((
            Self {
                cancel,
                task: Some(task),
            },
            events_rx,
        ))
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Stops the loop and waits for it to release its watches
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Mirror watch task ended abnormally");
            }
        }
        info!("Mirror watch stopped");
    }
}

impl Drop for MirrorWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_loop(
    mirror: Arc<DirectoryMirror>,
    mut watcher: FileWatcher,
    mut change_rx: mpsc::Receiver<crate::watcher::ChangeEvent>,
    events_tx: mpsc::Sender<MirrorEvent>,
    options: WatchOptions,
    cancel: CancellationToken,
) {
    let mut queue = DebouncedChangeQueue::new(options.debounce);
    let mut tick = tokio::time::interval(options.poll_interval.max(Duration::from_millis(1)));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            change = change_rx.recv() => match change {
                Some(change) => {
                    queue.push(&change);
                }
                None => break,
            },
            _ = tick.tick() => {
                if !flush(&mirror, &mut queue, &events_tx).await {
                    debug!("Mirror event receiver dropped");
                    break;
                }
            }
        }
    }

    watcher.unwatch_all();
    queue.clear();
}

/// Mirrors every settled name; returns `false` once nobody is listening
async fn flush(
    mirror: &DirectoryMirror,
    queue: &mut DebouncedChangeQueue,
    events_tx: &mpsc::Sender<MirrorEvent>,
) -> bool {
    for file in queue.poll() {
        let event = match mirror.sync_by_encrypted_name(&file).await {
            Ok(Some(outcome)) => MirrorEvent::Synced { file, outcome },
            Ok(None) => continue,
            Err(e) => {
                warn!(file = %file, error = %e, "Mirror failed");
                MirrorEvent::Error {
                    file,
                    error: format!("{e:#}"),
                }
            }
        };
        if events_tx.send(event).await.is_err() {
            return false;
        }
    }
    true
}
