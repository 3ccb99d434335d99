//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for identifiers and the session credential.
//! Each newtype checks its invariants at construction time, including when
//! it is deserialized from the store or the remote API.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// FileId
// ============================================================================

/// Opaque identifier of a [`FileRecord`](super::FileRecord)
///
/// New records get a UUID v4; ids coming from the remote metadata service are
/// accepted as any non-blank string without path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Create a FileId from an existing string
    ///
    /// # Errors
    /// Returns error if the id is blank or contains a path separator
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::InvalidId("File ID cannot be empty".to_string()));
        }
        if id.contains('/') || id.contains('\\') {
            return Err(DomainError::InvalidId(format!(
                "File ID contains a path separator: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Generate a fresh random FileId
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for FileId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

// ============================================================================
// UserId
// ============================================================================

/// Identifier of a principal (file owner, grantee, audit actor)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a UserId
    ///
    /// # Errors
    /// Returns error if the id is blank
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::InvalidId("User ID cannot be empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Principal used for entries written by the system itself
    #[must_use]
    pub fn system() -> Self {
        Self("system".to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for UserId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

// ============================================================================
// AuditId
// ============================================================================

/// Database-assigned identifier of an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(i64);

impl AuditId {
    /// Wrap a database row id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw row id
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl Display for AuditId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Credential
// ============================================================================

/// Opaque bearer credential issued by the authentication layer
///
/// Passed explicitly to every call that needs it and forwarded unchanged to
/// the transport. `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token
    ///
    /// # Errors
    /// Returns error if the token is blank
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "Credential cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// The raw token, for building authorization headers
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

// ============================================================================
// Blob names
// ============================================================================

/// Checks that `name` is usable as a single file name inside a vault or
/// replica directory.
///
/// # Errors
/// Returns [`DomainError::InvalidFileName`] for empty names, `.`/`..`, or
/// names containing a path separator or NUL.
pub fn validate_blob_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(DomainError::InvalidFileName(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(DomainError::InvalidFileName(name.to_string()));
    }
    Ok(())
}
