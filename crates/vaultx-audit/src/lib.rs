//! VaultX Audit - Append-only audit trail
//!
//! [`AuditLogger`] turns vault operations into `AuditEntry` rows through
//! the `IMetadataStore` port. Persistence failures are logged and swallowed.

pub mod logger;

pub use logger::AuditLogger;
