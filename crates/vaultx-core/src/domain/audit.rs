//! Audit entry domain entities
//!
//! Every state-changing operation in the vault appends an [`AuditEntry`].
//! Entries are never updated or deleted; the sync engines only emit them and
//! never read them back for their own decisions.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;
use super::file_record::now_millis;
use super::newtypes::{AuditId, FileId, UserId};

/// Actions that can be recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A plaintext file was encrypted into the vault and registered
    Upload,
    /// A vault file was decrypted for a user
    Download,
    /// A file record and its blob were removed
    Delete,
    /// A permission was granted
    Grant,
    /// A permission was revoked
    Revoke,
    /// The directory mirror propagated a newer copy
    Sync,
    /// The reconciler pulled a newer remote copy
    SyncDownload,
    /// The reconciler pushed a newer local copy
    SyncUpload,
    /// A reconciliation item failed
    SyncError,
    /// A local user account was created
    UserAdd,
    /// A user signed in
    Login,
}

impl AuditAction {
    /// Storage form, e.g. `"SYNC_UPLOAD"`
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Upload => "UPLOAD",
            AuditAction::Download => "DOWNLOAD",
            AuditAction::Delete => "DELETE",
            AuditAction::Grant => "GRANT",
            AuditAction::Revoke => "REVOKE",
            AuditAction::Sync => "SYNC",
            AuditAction::SyncDownload => "SYNC_DOWNLOAD",
            AuditAction::SyncUpload => "SYNC_UPLOAD",
            AuditAction::SyncError => "SYNC_ERROR",
            AuditAction::UserAdd => "USER_ADD",
            AuditAction::Login => "LOGIN",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "UPLOAD" => AuditAction::Upload,
            "DOWNLOAD" => AuditAction::Download,
            "DELETE" => AuditAction::Delete,
            "GRANT" => AuditAction::Grant,
            "REVOKE" => AuditAction::Revoke,
            "SYNC" => AuditAction::Sync,
            "SYNC_DOWNLOAD" => AuditAction::SyncDownload,
            "SYNC_UPLOAD" => AuditAction::SyncUpload,
            "SYNC_ERROR" => AuditAction::SyncError,
            "USER_ADD" => AuditAction::UserAdd,
            "LOGIN" => AuditAction::Login,
            other => return Err(DomainError::InvalidAuditAction(other.to_string())),
        };
        Ok(action)
    }
}

/// An append-only audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Assigned by the store on insert
    id: Option<AuditId>,
    timestamp: DateTime<Utc>,
    /// Principal the action is attributed to
    user_id: UserId,
    action: AuditAction,
    /// File the action concerns, when there is one
    file_id: Option<FileId>,
    /// Free-form structured details
    details: Value,
}

impl AuditEntry {
    /// Creates a new audit entry stamped with the current time
    ///
    /// # Example
    ///
    /// ```
    /// use vaultx_core::domain::{AuditAction, AuditEntry, UserId};
    ///
    /// let entry = AuditEntry::new(UserId::system(), AuditAction::Sync);
    /// assert!(entry.id().is_none()); // assigned on persist
    /// ```
    pub fn new(user_id: UserId, action: AuditAction) -> Self {
        Self {
            id: None,
            timestamp: now_millis(),
            user_id,
            action,
            file_id: None,
            details: Value::Null,
        }
    }

    pub fn with_id(mut self, id: AuditId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_file_id(mut self, file_id: FileId) -> Self {
        self.file_id = Some(file_id);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn id(&self) -> Option<AuditId> {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn file_id(&self) -> Option<&FileId> {
        self.file_id.as_ref()
    }

    pub fn details(&self) -> &Value {
        &self.details
    }
}
