//! Database connection pool management
//!
//! Wraps SQLx's `SqlitePool`: creates the database directory, enables WAL
//! and foreign keys, and applies the schema on first connection.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::StoreError;

/// Pool of SQLite connections to the metadata database
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database file at `db_path`
    ///
    /// # Errors
    ///
    /// `StoreError::ConnectionFailed` if the directory or connection cannot
    /// be created, `StoreError::MigrationFailed` if the schema fails to apply.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::ConnectionFailed(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to connect to database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::info!(path = %db_path.display(), "Metadata database opened");

        Ok(Self { pool })
    }

    /// In-memory database for tests
    ///
    /// Limited to one connection, since each SQLite in-memory connection is
    /// its own database.
    ///
    /// # Errors
    ///
    /// Same as [`DatabasePool::new`].
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        sqlx::raw_sql("PRAGMA foreign_keys = ON;")
            .execute(&pool)
            .await
            .map_err(|e| {
                StoreError::MigrationFailed(format!("Failed to enable foreign keys: {}", e))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::debug!("In-memory metadata database initialized");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
        const MIGRATIONS: [(&str, &str); 2] = [
            ("initial", include_str!("migrations/20260301_initial.sql")),
            ("users", include_str!("migrations/20260315_users.sql")),
        ];

        for (name, sql) in MIGRATIONS {
            sqlx::raw_sql(sql).execute(pool).await.map_err(|e| {
                StoreError::MigrationFailed(format!("Failed to run {} migration: {}", name, e))
            })?;
        }

        tracing::debug!(count = MIGRATIONS.len(), "Schema migration completed");
        Ok(())
    }
}
