//! AuditLogger - typed audit emission
//!
//! Wraps `IMetadataStore::append_audit()` with one method per auditable
//! operation. All methods are non-fatal: a failed write is reported with
//! `tracing::warn!` and never reaches the caller.

use std::sync::Arc;

use serde_json::json;
use vaultx_core::{
    domain::{AuditAction, AuditEntry, FileId, FileRecord, PermissionGrant, UserAccount, UserId},
    ports::IMetadataStore,
};

/// Audit logger over the metadata store
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn IMetadataStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn IMetadataStore>) -> Self {
        Self { store }
    }

    async fn save(&self, entry: AuditEntry) {
        if let Err(e) = self.store.append_audit(&entry).await {
            tracing::warn!(
                error = %e,
                action = %entry.action(),
                "Failed to save audit entry"
            );
        }
    }

    // ========================================================================
    // File operations
    // ========================================================================

    /// A plaintext file was encrypted and registered
    pub async fn log_upload(&self, record: &FileRecord) {
        let entry = AuditEntry::new(record.owner_id().clone(), AuditAction::Upload)
            .with_file_id(record.id().clone())
            .with_details(json!({
                "fileId": record.id().as_str(),
                "originalName": record.original_name(),
                "encryptedName": record.encrypted_name(),
            }));
        self.save(entry).await;
    }

    /// A vault file was decrypted for `user`
    pub async fn log_download(&self, user: &UserId, record: &FileRecord) {
        let entry = AuditEntry::new(user.clone(), AuditAction::Download)
            .with_file_id(record.id().clone())
            .with_details(json!({
                "fileId": record.id().as_str(),
                "originalName": record.original_name(),
            }));
        self.save(entry).await;
    }

    /// A file record and its blob were removed by `user`
    pub async fn log_delete(&self, user: &UserId, record: &FileRecord) {
        let entry = AuditEntry::new(user.clone(), AuditAction::Delete)
            .with_file_id(record.id().clone())
            .with_details(json!({
                "fileId": record.id().as_str(),
                "originalName": record.original_name(),
            }));
        self.save(entry).await;
    }

    // ========================================================================
    // Permissions
    // ========================================================================

    pub async fn log_grant(&self, actor: &UserId, grant: &PermissionGrant) {
        self.save(permission_entry(actor, AuditAction::Grant, grant))
            .await;
    }

    pub async fn log_revoke(&self, actor: &UserId, grant: &PermissionGrant) {
        self.save(permission_entry(actor, AuditAction::Revoke, grant))
            .await;
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// A local account was created
    pub async fn log_user_add(&self, account: &UserAccount) {
        let entry = AuditEntry::new(account.id().clone(), AuditAction::UserAdd).with_details(json!({
            "username": account.username(),
            "role": account.role().as_str(),
        }));
        self.save(entry).await;
    }

    /// `user` signed in; `remote` is set when a session token was issued
    pub async fn log_login(&self, user: &UserId, remote: bool) {
        let entry = AuditEntry::new(user.clone(), AuditAction::Login)
            .with_details(json!({ "remote": remote }));
        self.save(entry).await;
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// The directory mirror propagated a newer copy into `copies` replicas
    pub async fn log_mirror_sync(&self, owner: &UserId, file_id: &FileId, copies: usize) {
        let entry = AuditEntry::new(owner.clone(), AuditAction::Sync)
            .with_file_id(file_id.clone())
            .with_details(json!({
                "fileId": file_id.as_str(),
                "copies": copies,
            }));
        self.save(entry).await;
    }

    /// The reconciler replaced the local copy with the remote one
    pub async fn log_sync_download(&self, record: &FileRecord) {
        self.save(sync_entry(AuditAction::SyncDownload, record)).await;
    }

    /// The reconciler pushed the local copy to the remote
    pub async fn log_sync_upload(&self, record: &FileRecord) {
        self.save(sync_entry(AuditAction::SyncUpload, record)).await;
    }

    /// A reconciliation item failed
    pub async fn log_sync_error(&self, owner: &UserId, file_id: &FileId, direction: &str, message: &str) {
        let entry = AuditEntry::new(owner.clone(), AuditAction::SyncError)
            .with_file_id(file_id.clone())
            .with_details(json!({
                "fileId": file_id.as_str(),
                "direction": direction,
                "error": message,
            }));
        self.save(entry).await;
    }
}

fn permission_entry(actor: &UserId, action: AuditAction, grant: &PermissionGrant) -> AuditEntry {
    AuditEntry::new(actor.clone(), action)
        .with_file_id(grant.file_id.clone())
        .with_details(json!({
            "fileId": grant.file_id.as_str(),
            "userId": grant.user_id.as_str(),
            "permission": grant.permission.as_str(),
        }))
}

fn sync_entry(action: AuditAction, record: &FileRecord) -> AuditEntry {
    AuditEntry::new(record.owner_id().clone(), action)
        .with_file_id(record.id().clone())
        .with_details(json!({
            "fileId": record.id().as_str(),
            "version": record.version(),
        }))
}
