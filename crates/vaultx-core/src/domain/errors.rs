//! Domain error types
//!
//! Errors raised while constructing or validating domain values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Identifier is empty or contains forbidden characters
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// A file name that cannot be used inside a replica directory
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Unknown permission string
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),

    /// Unknown account role string
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Unknown audit action string
    #[error("Invalid audit action: {0}")]
    InvalidAuditAction(String),

    /// A file's version cannot be incremented any further
    #[error("Version exhausted for file {0}")]
    VersionExhausted(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
