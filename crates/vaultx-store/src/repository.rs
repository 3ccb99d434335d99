//! SQLite implementation of IMetadataStore
//!
//! ## Type Mapping
//!
//! | Domain Type       | SQL Type | Strategy                                   |
//! |-------------------|----------|--------------------------------------------|
//! | FileId, UserId    | TEXT     | `.as_str()` / `::new()`                    |
//! | DateTime<Utc>     | TEXT     | RFC 3339 with milliseconds, `Z` suffix     |
//! | Permission        | TEXT     | `"read"` / `"write"`                       |
//! | Role              | TEXT     | `"admin"` / `"user"`                       |
//! | AuditAction       | TEXT     | SCREAMING_SNAKE text, e.g. `"SYNC_UPLOAD"` |
//! | Audit details     | TEXT     | serde_json                                 |
//!
//! Fixed-width millisecond timestamps sort lexicographically in time order,
//! which the audit query relies on.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use vaultx_core::domain::{
    now_millis, AuditAction, AuditEntry, AuditId, DomainError, FileId, FileRecord, Permission,
    PermissionGrant, Role, UserAccount, UserId,
};
use vaultx_core::ports::IMetadataStore;

use crate::StoreError;

/// SQLite-backed metadata store
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Conversion helpers
// ============================================================================

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow(format!("Failed to parse datetime '{}': {}", s, e)))
}

fn file_record_from_row(row: &SqliteRow) -> Result<FileRecord, StoreError> {
    let id: String = row.get("id");
    let original_name: String = row.get("original_name");
    let encrypted_name: String = row.get("encrypted_name");
    let owner_id: String = row.get("owner_id");
    let version: i64 = row.get("version");
    let created_at: String = row.get("created_at");
    let last_modified_utc: String = row.get("last_modified_utc");
    let storage_path: Option<String> = row.get("storage_path");

    let corrupt = |e: DomainError| StoreError::CorruptRow(e.to_string());
    let version = u32::try_from(version)
        .map_err(|_| StoreError::CorruptRow(format!("version {version} out of range")))?;

    let mut record = FileRecord::new(
        FileId::new(id).map_err(corrupt)?,
        original_name,
        encrypted_name,
        UserId::new(owner_id).map_err(corrupt)?,
    )
    .map_err(corrupt)?
    .with_version(version)
    .map_err(corrupt)?
    .with_created_at(parse_datetime(&created_at)?)
    .with_last_modified(parse_datetime(&last_modified_utc)?);

    if let Some(path) = storage_path.filter(|p| !p.is_empty()) {
        record = record.with_storage_path(path);
    }
    Ok(record)
}

fn grant_from_row(row: &SqliteRow) -> Result<PermissionGrant, StoreError> {
    let file_id: String = row.get("file_id");
    let user_id: String = row.get("user_id");
    let permission: String = row.get("permission");

    let corrupt = |e: DomainError| StoreError::CorruptRow(e.to_string());
    Ok(PermissionGrant::new(
        FileId::new(file_id).map_err(corrupt)?,
        UserId::new(user_id).map_err(corrupt)?,
        permission.parse::<Permission>().map_err(corrupt)?,
    ))
}

fn audit_entry_from_row(row: &SqliteRow) -> Result<AuditEntry, StoreError> {
    let id: i64 = row.get("id");
    let timestamp: String = row.get("timestamp");
    let user_id: String = row.get("user_id");
    let action: String = row.get("action");
    let file_id: Option<String> = row.get("file_id");
    let details: String = row.get("details");

    let corrupt = |e: DomainError| StoreError::CorruptRow(e.to_string());
    let details: serde_json::Value = serde_json::from_str(&details)
        .map_err(|e| StoreError::CorruptRow(format!("Invalid audit details JSON: {}", e)))?;

    let mut entry = AuditEntry::new(
        UserId::new(user_id).map_err(corrupt)?,
        action.parse::<AuditAction>().map_err(corrupt)?,
    )
    .with_id(AuditId::new(id))
    .with_timestamp(parse_datetime(&timestamp)?)
    .with_details(details);

    if let Some(file_id) = file_id {
        entry = entry.with_file_id(FileId::new(file_id).map_err(corrupt)?);
    }
    Ok(entry)
}

fn user_from_row(row: &SqliteRow) -> Result<UserAccount, StoreError> {
    let username: String = row.get("username");
    let password_hash: String = row.get("password_hash");
    let role: String = row.get("role");
    let created_at: String = row.get("created_at");

    let corrupt = |e: DomainError| StoreError::CorruptRow(e.to_string());
    Ok(
        UserAccount::new(username, password_hash, role.parse::<Role>().map_err(corrupt)?)
            .map_err(corrupt)?
            .with_created_at(parse_datetime(&created_at)?),
    )
}

fn collect<T>(
    rows: &[SqliteRow],
    map: fn(&SqliteRow) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    rows.iter().map(map).collect()
}

// ============================================================================
// IMetadataStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IMetadataStore for SqliteMetadataStore {
    async fn get_file_records(&self) -> anyhow::Result<Vec<FileRecord>> {
        let rows = sqlx::query("SELECT * FROM files ORDER BY original_name ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(collect(&rows, file_record_from_row)?)
    }

    async fn get_file_record(&self, id: &FileId) -> anyhow::Result<Option<FileRecord>> {
        let row = sqlx::query("SELECT * FROM files WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(file_record_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn get_file_by_encrypted_name(
        &self,
        encrypted_name: &str,
    ) -> anyhow::Result<Option<FileRecord>> {
        let row = sqlx::query("SELECT * FROM files WHERE encrypted_name = ?")
            .bind(encrypted_name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(file_record_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert_file_record(&self, record: &FileRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO files \
             (id, original_name, encrypted_name, owner_id, version, \
              created_at, last_modified_utc, storage_path) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
              original_name = excluded.original_name, \
              encrypted_name = excluded.encrypted_name, \
              owner_id = excluded.owner_id, \
              version = excluded.version, \
              created_at = excluded.created_at, \
              last_modified_utc = excluded.last_modified_utc, \
              storage_path = excluded.storage_path",
        )
        .bind(record.id().as_str())
        .bind(record.original_name())
        .bind(record.encrypted_name())
        .bind(record.owner_id().as_str())
        .bind(i64::from(record.version()))
        .bind(format_datetime(&record.created_at()))
        .bind(format_datetime(&record.last_modified_utc()))
        .bind(record.storage_path())
        .execute(&self.pool)
        .await?;

        tracing::trace!(file_id = %record.id(), version = record.version(), "Upserted file record");
        Ok(())
    }

    async fn delete_file_record(&self, id: &FileId) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM permissions WHERE file_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(file_id = %id, deleted = result.rows_affected(), "Deleted file record");
        Ok(())
    }

    async fn bump_version_and_timestamp(
        &self,
        id: &FileId,
    ) -> anyhow::Result<Option<FileRecord>> {
        // Stored timestamps are fixed-width RFC 3339, so MAX orders them
        // chronologically.
        let result = sqlx::query(
            "UPDATE files \
             SET version = version + 1, last_modified_utc = MAX(last_modified_utc, ?) \
             WHERE id = ? AND version < ?",
        )
        .bind(format_datetime(&now_millis()))
        .bind(id.as_str())
        .bind(i64::from(u32::MAX))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_file_record(id).await? {
                Some(_) => Err(DomainError::VersionExhausted(id.to_string()).into()),
                None => Ok(None),
            };
        }
        self.get_file_record(id).await
    }

    async fn list_files_accessible_by(&self, user: &UserId) -> anyhow::Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            "SELECT f.* FROM files f \
             WHERE f.owner_id = ? \
                OR EXISTS (SELECT 1 FROM permissions p WHERE p.file_id = f.id AND p.user_id = ?) \
             ORDER BY f.original_name ASC, f.id ASC",
        )
        .bind(user.as_str())
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(collect(&rows, file_record_from_row)?)
    }

    async fn grant_permission(&self, grant: &PermissionGrant) -> anyhow::Result<()> {
        sqlx::query("INSERT OR IGNORE INTO permissions (file_id, user_id, permission) VALUES (?, ?, ?)")
            .bind(grant.file_id.as_str())
            .bind(grant.user_id.as_str())
            .bind(grant.permission.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_permission(&self, grant: &PermissionGrant) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM permissions WHERE file_id = ? AND user_id = ? AND permission = ?")
            .bind(grant.file_id.as_str())
            .bind(grant.user_id.as_str())
            .bind(grant.permission.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_permissions(&self, file_id: &FileId) -> anyhow::Result<Vec<PermissionGrant>> {
        let rows = sqlx::query(
            "SELECT * FROM permissions WHERE file_id = ? ORDER BY user_id ASC, permission ASC",
        )
        .bind(file_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(collect(&rows, grant_from_row)?)
    }

    async fn add_user(&self, account: &UserAccount) -> anyhow::Result<()> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(account.username())
        .bind(account.password_hash())
        .bind(account.role().as_str())
        .bind(format_datetime(&account.created_at()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                StoreError::AlreadyExists(format!("user {}", account.username())).into(),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, username: &str) -> anyhow::Result<Option<UserAccount>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn append_audit(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        let details = serde_json::to_string(entry.details())
            .map_err(|e| anyhow::anyhow!("Failed to serialize audit details: {}", e))?;

        sqlx::query(
            "INSERT INTO audit_log (timestamp, user_id, action, file_id, details) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(format_datetime(&entry.timestamp()))
        .bind(entry.user_id().as_str())
        .bind(entry.action().as_str())
        .bind(entry.file_id().map(FileId::as_str))
        .bind(&details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_audit(&self, limit: u32) -> anyhow::Result<Vec<AuditEntry>> {
        let rows = sqlx::query("SELECT * FROM audit_log ORDER BY timestamp DESC, id DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(collect(&rows, audit_entry_from_row)?)
    }
}
