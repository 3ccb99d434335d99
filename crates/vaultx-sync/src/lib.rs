//! VaultX Sync - Metadata-versioned synchronization
//!
//! Two independent engines keep ciphertext blobs converged using the
//! `version` / `last_modified_utc` pair of each `FileRecord`:
//!
//! - [`reconciler`] - Last-writer-wins reconciliation against the remote
//!   transport, one single-flight pass at a time
//! - [`mirror`] - Propagates the newest local copy of a blob across a set
//!   of replica directories
//!
//! Supporting modules:
//!
//! - [`vault_dir`] - Flat directory of ciphertext blobs with atomic writes
//! - [`watcher`] - `notify`-based file watcher and per-name debounce queue
//! - [`scheduler`] - The watch-mode event loop driving the mirror

pub mod mirror;
pub mod reconciler;
pub mod scheduler;
pub mod vault_dir;
pub mod watcher;

pub use mirror::{DirectoryMirror, MirrorOutcome, ReplicaCopy};
pub use reconciler::{Direction, ItemFailure, SkipReason, SyncReconciler, SyncReport};
pub use scheduler::{MirrorEvent, MirrorWatcher, WatchOptions};
pub use vault_dir::VaultDir;

use thiserror::Error;
use vaultx_core::domain::{DomainError, FileId};

/// Errors raised by the synchronization engines
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred in a vault or replica directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No file record exists with this id
    #[error("Unknown file: {0}")]
    UnknownFile(FileId),

    /// A remote record cannot be downloaded because it has no storage path
    #[error("Remote record {0} has no storage path")]
    MissingStoragePath(FileId),

    /// A transfer step of a reconciliation item failed
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// A blob name failed validation
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
