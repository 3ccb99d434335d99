//! Remote reconciliation
//!
//! A [`SyncReconciler`] pass compares the local metadata store with the
//! remote record list and moves blobs in whichever direction has the
//! strictly newer `last_modified_utc`:
//!
//! ```text
//! list_remote_records ─┐
//!                      ├─► plan ─► downloads (all) ─► uploads (all) ─► SyncReport
//! get_file_records ────┘
//! ```
//!
//! Equal timestamps mean "in sync", regardless of version. A remote entry
//! that fails validation is reported as a download failure and its local
//! copy is held back from upload. Only one pass
//! runs at a time per reconciler; a concurrent caller gets a skipped report
//! without any transport traffic.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use vaultx_audit::AuditLogger;
use vaultx_core::{
    domain::{now_millis, Credential, FileId, FileRecord},
    ports::{IMetadataStore, ITransport, RejectedRecord},
};

use crate::vault_dir::VaultDir;
use crate::SyncError;

// ============================================================================
// Report types
// ============================================================================

/// Why a pass did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Another pass on the same reconciler is still running
    AlreadySyncing,
    /// No credential was supplied
    NoCredential,
}

/// Transfer direction of a reconciliation item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Download => "download",
            Direction::Upload => "upload",
        }
    }
}

/// One item that failed during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub file_id: FileId,
    pub direction: Direction,
    pub message: String,
}

/// Outcome of [`SyncReconciler::run_sync`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Set when the pass was skipped; all other fields are then empty
    pub skipped: Option<SkipReason>,
    pub downloaded: Vec<FileId>,
    pub uploaded: Vec<FileId>,
    pub failures: Vec<ItemFailure>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// True when the pass ran and no item failed
    pub fn is_clean(&self) -> bool {
        self.skipped.is_none() && self.failures.is_empty()
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Records to move in each direction
#[derive(Debug, Default)]
pub(crate) struct SyncPlan {
    pub(crate) to_download: Vec<FileRecord>,
    pub(crate) to_upload: Vec<FileRecord>,
}

/// Last-writer-wins comparison by id
///
/// Remote-only and strictly newer remote records are downloaded; local-only
/// and strictly newer local records are uploaded. Input order is kept.
pub(crate) fn plan(local: &[FileRecord], remote: &[FileRecord]) -> SyncPlan {
    let local_by_id: HashMap<&FileId, &FileRecord> = local.iter().map(|r| (r.id(), r)).collect();
    let remote_by_id: HashMap<&FileId, &FileRecord> =
        remote.iter().map(|r| (r.id(), r)).collect();

    let to_download = remote
        .iter()
        .filter(|r| match local_by_id.get(r.id()) {
            Some(l) => r.is_newer_than(l),
            None => true,
        })
        .cloned()
        .collect();

    let to_upload = local
        .iter()
        .filter(|l| match remote_by_id.get(l.id()) {
            Some(r) => l.is_newer_than(r),
            None => true,
        })
        .cloned()
        .collect();

    SyncPlan {
        to_download,
        to_upload,
    }
}

// ============================================================================
// SyncReconciler
// ============================================================================

/// Releases the single-flight flag on every exit path
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reconciles the local store and vault directory with the remote transport
pub struct SyncReconciler {
    store: Arc<dyn IMetadataStore>,
    transport: Arc<dyn ITransport>,
    vault: VaultDir,
    audit: AuditLogger,
    syncing: AtomicBool,
}

impl SyncReconciler {
    pub fn new(
        store: Arc<dyn IMetadataStore>,
        transport: Arc<dyn ITransport>,
        vault: VaultDir,
        audit: AuditLogger,
    ) -> Self {
        Self {
            store,
            transport,
            vault,
            audit,
            syncing: AtomicBool::new(false),
        }
    }

    /// Whether a pass is currently running
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Runs one reconciliation pass
    ///
    /// Returns a skipped report, with no side effects, when a pass is
    /// already active or `credential` is `None`. Per-item failures,
    /// including malformed remote entries, are collected in the report;
    /// only failing to list the remote or local records returns `Err`.
    #[tracing::instrument(skip(self, credential))]
    pub async fn run_sync(&self, credential: Option<&Credential>) -> Result<SyncReport> {
        let Some(credential) = credential else {
            debug!("Sync skipped: no credential");
            return Ok(SyncReport::skipped(SkipReason::NoCredential));
        };

        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sync skipped: pass already in progress");
            return Ok(SyncReport::skipped(SkipReason::AlreadySyncing));
        }
        let _guard = SyncGuard(&self.syncing);

        let start = Instant::now();
        let mut report = SyncReport::default();

        let listing = self
            .transport
            .list_remote_records(credential)
            .await
            .context("Failed to list remote records")?;
        let local = self
            .store
            .get_file_records()
            .await
            .context("Failed to load local records")?;
        let remote = listing.records;

        let mut plan = plan(&local, &remote);
        if !listing.rejected.is_empty() {
            let held: HashSet<&FileId> =
                listing.rejected.iter().filter_map(|r| r.id.as_ref()).collect();
            plan.to_upload.retain(|r| !held.contains(r.id()));
            for rejected in &listing.rejected {
                self.record_rejected(&mut report, &local, rejected).await;
            }
        }
        info!(
            remote = remote.len(),
            rejected = listing.rejected.len(),
            local = local.len(),
            to_download = plan.to_download.len(),
            to_upload = plan.to_upload.len(),
            "Starting sync pass"
        );

        for record in &plan.to_download {
            match self.download(record, credential).await {
                Ok(()) => {
                    debug!(file_id = %record.id(), version = record.version(), "Downloaded");
                    self.audit.log_sync_download(record).await;
                    report.downloaded.push(record.id().clone());
                }
                Err(e) => {
                    self.record_failure(&mut report, record, Direction::Download, e)
                        .await
                }
            }
        }

        for record in &plan.to_upload {
            match self.upload(record, credential).await {
                Ok(updated) => {
                    debug!(file_id = %updated.id(), version = updated.version(), "Uploaded");
                    self.audit.log_sync_upload(&updated).await;
                    report.uploaded.push(updated.id().clone());
                }
                Err(e) => {
                    self.record_failure(&mut report, record, Direction::Upload, e)
                        .await
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            downloaded = report.downloaded.len(),
            uploaded = report.uploaded.len(),
            failed = report.failures.len(),
            duration_ms = report.duration_ms,
            "Sync pass finished"
        );
        Ok(report)
    }

    /// Fetches the remote blob and adopts the remote record verbatim
    async fn download(&self, remote: &FileRecord, credential: &Credential) -> Result<()> {
        let storage_path = remote
            .storage_path()
            .ok_or_else(|| SyncError::MissingStoragePath(remote.id().clone()))?;

        let locator = self
            .transport
            .request_download_locator(storage_path, credential)
            .await
            .context("download locator")?;
        let bytes = self
            .transport
            .get_bytes(&locator.read_locator)
            .await
            .context("blob download")?;

        self.vault.write(remote.encrypted_name(), &bytes).await?;
        self.store.upsert_file_record(remote).await?;
        Ok(())
    }

    /// Pushes the local blob and records `version + 1` on both sides
    async fn upload(&self, local: &FileRecord, credential: &Credential) -> Result<FileRecord> {
        let bumped = local.bumped(now_millis())?;
        let bytes = self.vault.read(local.encrypted_name()).await?;

        let target = self
            .transport
            .request_upload_target(local.encrypted_name(), credential)
            .await
            .context("upload target")?;
        self.transport
            .put_bytes(&target.write_locator, bytes)
            .await
            .context("blob upload")?;

        let updated = bumped.with_storage_path(target.storage_path);
        self.transport
            .persist_remote_metadata(&updated, credential)
            .await
            .context("remote metadata")?;
        self.store.upsert_file_record(&updated).await?;
        Ok(updated)
    }

    /// Reports a remote entry that could not be decoded
    async fn record_rejected(
        &self,
        report: &mut SyncReport,
        local: &[FileRecord],
        rejected: &RejectedRecord,
    ) {
        let Some(file_id) = &rejected.id else {
            warn!(error = %rejected.reason, "Skipping remote entry without a usable id");
            return;
        };
        let message = SyncError::Transfer(format!("invalid remote record: {}", rejected.reason))
            .to_string();
        warn!(file_id = %file_id, error = %message, "Sync item failed");
        if let Some(owner) = local.iter().find(|r| r.id() == file_id).map(|r| r.owner_id()) {
            self.audit
                .log_sync_error(owner, file_id, Direction::Download.as_str(), &message)
                .await;
        }
        report.failures.push(ItemFailure {
            file_id: file_id.clone(),
            direction: Direction::Download,
            message,
        });
    }

    async fn record_failure(
        &self,
        report: &mut SyncReport,
        record: &FileRecord,
        direction: Direction,
        error: anyhow::Error,
    ) {
        let message = SyncError::Transfer(format!("{error:#}")).to_string();
        warn!(
            file_id = %record.id(),
            direction = direction.as_str(),
            error = %message,
            "Sync item failed"
        );
        self.audit
            .log_sync_error(record.owner_id(), record.id(), direction.as_str(), &message)
            .await;
        report.failures.push(ItemFailure {
            file_id: record.id().clone(),
            direction,
            message,
        });
    }
}
