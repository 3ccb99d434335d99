//! File metadata records
//!
//! A [`FileRecord`] tracks one encrypted file: its human-readable name, the
//! name of its ciphertext blob, its owner, and the version/timestamp pair the
//! synchronization engines use for last-writer-wins reconciliation.
//!
//! ## Versioning
//!
//! `version` starts at 1 and only ever moves forward by exactly one, via
//! [`FileRecord::bumped`] here or the store's `bump_version_and_timestamp`.
//! `last_modified_utc` is the sole tie-breaker between replicas.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{validate_blob_name, FileId, UserId};

/// Current time truncated to millisecond precision
///
/// Timestamps are persisted as RFC 3339 with milliseconds, both in SQLite and
/// on the wire; truncating at creation keeps a value identical after a round
/// trip through either.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Metadata record for one encrypted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawFileRecord")]
pub struct FileRecord {
    id: FileId,
    original_name: String,
    encrypted_name: String,
    owner_id: UserId,
    version: u32,
    created_at: DateTime<Utc>,
    #[serde(rename = "lastModifiedUTC")]
    last_modified_utc: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_path: Option<String>,
}

/// Unvalidated wire shape, checked by `TryFrom` during deserialization
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFileRecord {
    id: FileId,
    original_name: String,
    encrypted_name: String,
    owner_id: UserId,
    version: u32,
    created_at: DateTime<Utc>,
    #[serde(rename = "lastModifiedUTC")]
    last_modified_utc: DateTime<Utc>,
    #[serde(default)]
    storage_path: Option<String>,
}

impl TryFrom<RawFileRecord> for FileRecord {
    type Error = DomainError;

    fn try_from(raw: RawFileRecord) -> Result<Self, Self::Error> {
        validate_blob_name(&raw.encrypted_name)?;
        if raw.version == 0 {
            return Err(DomainError::ValidationFailed(format!(
                "version must be at least 1 for file {}",
                raw.id
            )));
        }
        Ok(Self {
            id: raw.id,
            original_name: raw.original_name,
            encrypted_name: raw.encrypted_name,
            owner_id: raw.owner_id,
            version: raw.version,
            created_at: raw.created_at,
            last_modified_utc: raw.last_modified_utc,
            storage_path: raw.storage_path.filter(|p| !p.is_empty()),
        })
    }
}

impl FileRecord {
    /// Creates a record for a freshly registered file
    ///
    /// Version is 1 and both timestamps are the current time.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidFileName`] if `encrypted_name` cannot be
    /// used as a file name inside a replica directory.
    pub fn new(
        id: FileId,
        original_name: impl Into<String>,
        encrypted_name: impl Into<String>,
        owner_id: UserId,
    ) -> Result<Self, DomainError> {
        let encrypted_name = encrypted_name.into();
        validate_blob_name(&encrypted_name)?;
        let now = now_millis();
        Ok(Self {
            id,
            original_name: original_name.into(),
            encrypted_name,
            owner_id,
            version: 1,
            created_at: now,
            last_modified_utc: now,
            storage_path: None,
        })
    }

    // ------------------------------------------------------------------
    // Builder-style setters used when restoring persisted records
    // ------------------------------------------------------------------

    /// Sets the version
    ///
    /// # Errors
    /// Returns error if `version` is 0
    pub fn with_version(mut self, version: u32) -> Result<Self, DomainError> {
        if version == 0 {
            return Err(DomainError::ValidationFailed(
                "version must be at least 1".to_string(),
            ));
        }
        self.version = version;
        Ok(self)
    }

    /// Sets the creation timestamp
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Sets the last-modified timestamp
    #[must_use]
    pub fn with_last_modified(mut self, last_modified_utc: DateTime<Utc>) -> Self {
        self.last_modified_utc = last_modified_utc;
        self
    }

    /// Attaches the remote storage locator
    #[must_use]
    pub fn with_storage_path(mut self, storage_path: impl Into<String>) -> Self {
        self.storage_path = Some(storage_path.into());
        self
    }

    /// Returns a copy with `version + 1` and `last_modified_utc = now`
    ///
    /// The timestamp never moves backwards: a record already stamped later
    /// than `now` keeps its own time.
    ///
    /// # Errors
    /// Returns [`DomainError::VersionExhausted`] if the version is already
    /// `u32::MAX`.
    pub fn bumped(&self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let version = self
            .version
            .checked_add(1)
            .ok_or_else(|| DomainError::VersionExhausted(self.id.to_string()))?;
        let mut next = self.clone();
        next.version = version;
        next.last_modified_utc = now.max(self.last_modified_utc);
        Ok(next)
    }

    /// True when this record was modified strictly after `other`
    #[must_use]
    pub fn is_newer_than(&self, other: &FileRecord) -> bool {
        self.last_modified_utc > other.last_modified_utc
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn encrypted_name(&self) -> &str {
        &self.encrypted_name
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified_utc(&self) -> DateTime<Utc> {
        self.last_modified_utc
    }

    pub fn storage_path(&self) -> Option<&str> {
        self.storage_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn sample() -> FileRecord {
        FileRecord::new(
            FileId::new("file-1".to_string()).unwrap(),
            "report.pdf",
            "report.enc",
            UserId::new("alice".to_string()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_starts_at_version_one() {
        let record = sample();
        assert_eq!(record.version(), 1);
        assert_eq!(record.created_at(), record.last_modified_utc());
        assert!(record.storage_path().is_none());
    }

    #[test]
    fn test_new_rejects_path_like_blob_name() {
        let result = FileRecord::new(
            FileId::generate(),
            "a.txt",
            "../escape.enc",
            UserId::new("alice".to_string()).unwrap(),
        );
        assert!(matches!(result, Err(DomainError::InvalidFileName(_))));
    }

    #[test]
    fn test_bumped_increments_by_one() {
        let record = sample().with_version(7).unwrap();
        let later = record.last_modified_utc() + Duration::seconds(5);
        let next = record.bumped(later).unwrap();
        assert_eq!(next.version(), 8);
        assert_eq!(next.last_modified_utc(), later);
        assert_eq!(next.id(), record.id());
        assert_eq!(next.created_at(), record.created_at());
    }

    #[test]
    fn test_bumped_never_moves_timestamp_back() {
        let ahead = now_millis() + Duration::days(1);
        let record = sample().with_last_modified(ahead);
        let next = record.bumped(now_millis()).unwrap();
        assert_eq!(next.version(), 2);
        assert_eq!(next.last_modified_utc(), ahead);
    }

    #[test]
    fn test_bumped_fails_at_max_version() {
        let record = sample().with_version(u32::MAX).unwrap();
        let result = record.bumped(now_millis());
        assert!(matches!(result, Err(DomainError::VersionExhausted(_))));
    }

    #[test]
    fn test_with_version_rejects_zero() {
        assert!(sample().with_version(0).is_err());
    }

    #[test]
    fn test_is_newer_than_is_strict() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = sample().with_last_modified(t0);
        let b = sample().with_last_modified(t0);
        assert!(!a.is_newer_than(&b));
        assert!(!b.is_newer_than(&a));

        let c = sample().with_last_modified(t0 + Duration::milliseconds(1));
        assert!(c.is_newer_than(&a));
        assert!(!a.is_newer_than(&c));
    }

    #[test]
    fn test_wire_format_field_names() {
        let record = sample().with_storage_path("uploads/report.enc");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["originalName"], "report.pdf");
        assert_eq!(json["encryptedName"], "report.enc");
        assert_eq!(json["ownerId"], "alice");
        assert_eq!(json["version"], 1);
        assert!(json.get("lastModifiedUTC").is_some());
        assert_eq!(json["storagePath"], "uploads/report.enc");
    }

    #[test]
    fn test_storage_path_omitted_when_absent() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("storagePath").is_none());
    }

    #[test]
    fn test_deserialize_remote_record() {
        let json = serde_json::json!({
            "id": "file1",
            "originalName": "notes.txt",
            "encryptedName": "notes.enc",
            "ownerId": "user1",
            "version": 2,
            "createdAt": "2024-01-01T00:00:00.000Z",
            "lastModifiedUTC": "2024-01-02T10:00:00.000Z",
            "storagePath": "path/file1"
        });
        let record: FileRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.version(), 2);
        assert_eq!(record.storage_path(), Some("path/file1"));
        assert_eq!(
            record.last_modified_utc(),
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_deserialize_rejects_version_zero() {
        let json = serde_json::json!({
            "id": "file1",
            "originalName": "notes.txt",
            "encryptedName": "notes.enc",
            "ownerId": "user1",
            "version": 0,
            "createdAt": "2024-01-01T00:00:00Z",
            "lastModifiedUTC": "2024-01-01T00:00:00Z"
        });
        assert!(serde_json::from_value::<FileRecord>(json).is_err());
    }

    #[test]
    fn test_now_millis_has_no_sub_millisecond_part() {
        let now = now_millis();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
