//! Metadata store port
//!
//! Defines the [`IMetadataStore`] trait, the single source of truth for
//! local file versions. The sync reconciler mutates it only while holding its
//! single-flight lock.

use crate::domain::{AuditEntry, FileId, FileRecord, PermissionGrant, UserAccount, UserId};

/// Durable storage for file records, permission grants, user accounts and
/// audit entries
#[async_trait::async_trait]
pub trait IMetadataStore: Send + Sync {
    // ========================================================================
    // File records
    // ========================================================================

    /// All records, ordered by original name (ties broken by id)
    async fn get_file_records(&self) -> anyhow::Result<Vec<FileRecord>>;

    /// A single record by id
    async fn get_file_record(&self, id: &FileId) -> anyhow::Result<Option<FileRecord>>;

    /// A single record by the name of its ciphertext blob
    async fn get_file_by_encrypted_name(
        &self,
        encrypted_name: &str,
    ) -> anyhow::Result<Option<FileRecord>>;

    /// Inserts or fully replaces the record with the same id
    async fn upsert_file_record(&self, record: &FileRecord) -> anyhow::Result<()>;

    /// Hard-deletes a record together with its permission grants
    ///
    /// Deleting an unknown id is not an error.
    async fn delete_file_record(&self, id: &FileId) -> anyhow::Result<()>;

    /// Atomically increments `version` by one and sets `last_modified_utc`
    /// to the current time, or keeps it if it is already later
    ///
    /// Returns the updated record, or `None` if the id is unknown. A record
    /// whose version cannot grow any further is an error.
    async fn bump_version_and_timestamp(&self, id: &FileId)
        -> anyhow::Result<Option<FileRecord>>;

    /// Records the user owns or holds any grant on, ordered like
    /// [`get_file_records`](IMetadataStore::get_file_records)
    async fn list_files_accessible_by(&self, user: &UserId) -> anyhow::Result<Vec<FileRecord>>;

    // ========================================================================
    // Permissions
    // ========================================================================

    /// Adds a grant; granting an existing triple is a no-op
    async fn grant_permission(&self, grant: &PermissionGrant) -> anyhow::Result<()>;

    /// Removes a grant; revoking a missing triple is a no-op
    async fn revoke_permission(&self, grant: &PermissionGrant) -> anyhow::Result<()>;

    /// All grants on a file
    async fn list_permissions(&self, file_id: &FileId) -> anyhow::Result<Vec<PermissionGrant>>;

    // ========================================================================
    // User accounts
    // ========================================================================

    /// Registers a new account; an existing username is an error
    async fn add_user(&self, account: &UserAccount) -> anyhow::Result<()>;

    /// An account by username
    async fn get_user(&self, username: &str) -> anyhow::Result<Option<UserAccount>>;

    // ========================================================================
    // Audit log
    // ========================================================================

    /// Appends an audit entry
    async fn append_audit(&self, entry: &AuditEntry) -> anyhow::Result<()>;

    /// Most recent entries, newest first
    async fn recent_audit(&self, limit: u32) -> anyhow::Result<Vec<AuditEntry>>;
}
