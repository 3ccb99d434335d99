//! Domain entities and business rules
//!
//! - Newtypes for identifiers and the opaque session credential
//! - File metadata records and their versioning rules
//! - Permission grants
//! - Local user accounts and roles
//! - Audit entries
//! - Domain-specific error types

pub mod audit;
pub mod errors;
pub mod file_record;
pub mod newtypes;
pub mod permission;
pub mod user;

// Re-export commonly used types
pub use audit::{AuditAction, AuditEntry};
pub use errors::DomainError;
pub use file_record::{now_millis, FileRecord};
pub use newtypes::*;
pub use permission::{Permission, PermissionGrant};
pub use user::{Role, UserAccount};
