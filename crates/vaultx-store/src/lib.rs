//! VaultX Store - SQLite metadata persistence
//!
//! Implements the `IMetadataStore` port from `vaultx-core`:
//! - File records (version, timestamps, storage path)
//! - Permission grants
//! - Local user accounts
//! - Append-only audit log
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use vaultx_store::{DatabasePool, SqliteMetadataStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/vaultx/metadata.db")).await?;
//! let store = SqliteMetadataStore::new(pool.pool().clone());
//! // Use store as IMetadataStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteMetadataStore;

/// Errors that can occur in the metadata store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A row with the same unique key already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A stored row could not be turned back into a domain value
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
