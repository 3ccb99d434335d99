//! Local directory mirror
//!
//! Keeps every replica directory holding the newest copy of each tracked
//! ciphertext blob. The newest copy is chosen by filesystem modification
//! time; copies keep the source's mtime so converged replicas compare equal
//! and a later pass finds nothing to do.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use vaultx_audit::AuditLogger;
use vaultx_core::{
    domain::{validate_blob_name, FileId, FileRecord},
    ports::IMetadataStore,
};

use crate::SyncError;

/// The newest existing copy of a blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaCopy {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Result of mirroring one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorOutcome {
    pub file_id: FileId,
    /// Number of replicas that received a copy
    pub updated: usize,
}

/// Propagates the newest copy of a blob across replica directories
pub struct DirectoryMirror {
    store: Arc<dyn IMetadataStore>,
    audit: AuditLogger,
    directories: Vec<PathBuf>,
}

impl DirectoryMirror {
    pub fn new(
        store: Arc<dyn IMetadataStore>,
        audit: AuditLogger,
        directories: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        let mut mirror = Self {
            store,
            audit,
            directories: Vec::new(),
        };
        mirror.set_directories(directories);
        mirror
    }

    /// Replaces the replica set, dropping duplicates in first-seen order
    pub fn set_directories(&mut self, directories: impl IntoIterator<Item = PathBuf>) {
        self.directories.clear();
        for dir in directories {
            if !self.directories.contains(&dir) {
                self.directories.push(dir);
            }
        }
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Newest copy of `encrypted_name` among the replicas, by mtime
    ///
    /// On equal mtimes the earliest directory wins.
    pub async fn find_latest_copy(&self, encrypted_name: &str) -> Option<ReplicaCopy> {
        let mut latest: Option<ReplicaCopy> = None;
        for dir in &self.directories {
            let path = dir.join(encrypted_name);
            let Some(modified) = modified_time(&path).await else {
                continue;
            };
            if latest.as_ref().map_or(true, |l| modified > l.modified) {
                latest = Some(ReplicaCopy { path, modified });
            }
        }
        latest
    }

    /// Mirrors the blob of the record with `id` into every stale replica
    ///
    /// # Errors
    /// [`SyncError::UnknownFile`] when no record has this id; otherwise the
    /// first copy or store error. Copies made before a failure still count
    /// and are recorded.
    #[tracing::instrument(skip(self), fields(file_id = %id))]
    pub async fn sync_file_by_id(&self, id: &FileId) -> Result<MirrorOutcome> {
        let record = self
            .store
            .get_file_record(id)
            .await?
            .ok_or_else(|| SyncError::UnknownFile(id.clone()))?;
        self.mirror_record(&record).await
    }

    /// Mirrors the blob named `encrypted_name`
    ///
    /// Returns `Ok(None)` for names the store does not track.
    pub async fn sync_by_encrypted_name(
        &self,
        encrypted_name: &str,
    ) -> Result<Option<MirrorOutcome>> {
        match self.store.get_file_by_encrypted_name(encrypted_name).await? {
            Some(record) => Ok(Some(self.mirror_record(&record).await?)),
            None => {
                debug!(name = encrypted_name, "Ignoring untracked file");
                Ok(None)
            }
        }
    }

    async fn mirror_record(&self, record: &FileRecord) -> Result<MirrorOutcome> {
        let name = record.encrypted_name();
        validate_blob_name(name)?;

        let mut outcome = MirrorOutcome {
            file_id: record.id().clone(),
            updated: 0,
        };

        let Some(source) = self.find_latest_copy(name).await else {
            debug!(name, "No copy in any replica");
            return Ok(outcome);
        };

        let mut first_error: Option<anyhow::Error> = None;
        for dir in &self.directories {
            let target = dir.join(name);
            if target == source.path {
                continue;
            }
            let stale = match modified_time(&target).await {
                Some(modified) => modified < source.modified,
                None => true,
            };
            if !stale {
                continue;
            }
            match copy_preserving_mtime(&source.path, &target, source.modified).await {
                Ok(()) => {
                    debug!(target = %target.display(), "Replica updated");
                    outcome.updated += 1;
                }
                Err(e) => {
                    warn!(target = %target.display(), error = %e, "Replica copy failed");
                    first_error.get_or_insert(e.into());
                }
            }
        }

        if outcome.updated > 0 {
            self.store.bump_version_and_timestamp(record.id()).await?;
            self.audit
                .log_mirror_sync(record.owner_id(), record.id(), outcome.updated)
                .await;
            info!(
                file_id = %record.id(),
                copies = outcome.updated,
                source = %source.path.display(),
                "Mirrored file"
            );
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }
}

async fn modified_time(path: &Path) -> Option<SystemTime> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    meta.modified().ok()
}

/// Copies `source` over `target` through a sibling temp file, stamping the
/// temp file with `modified` before the rename
async fn copy_preserving_mtime(
    source: &Path,
    target: &Path,
    modified: SystemTime,
) -> Result<(), SyncError> {
    let source = source.to_path_buf();
    let target = target.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = target.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::copy(&source, &tmp)?;
        let stamp = std::fs::OpenOptions::new()
            .write(true)
            .open(&tmp)
            .and_then(|f| f.set_modified(modified));
        if let Err(e) = stamp.and_then(|()| std::fs::rename(&tmp, &target)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
    Ok(())
}
