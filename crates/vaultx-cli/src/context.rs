//! Shared state for command execution
//!
//! Opens the metadata database and vault directory named by the
//! configuration and wires the store into an audit logger.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use vaultx_audit::AuditLogger;
use vaultx_core::config::Config;
use vaultx_core::domain::{FileId, FileRecord, UserId};
use vaultx_core::ports::IMetadataStore;
use vaultx_store::{DatabasePool, SqliteMetadataStore};
use vaultx_sync::VaultDir;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn IMetadataStore>,
    pub audit: AuditLogger,
    pub vault: VaultDir,
}

impl AppContext {
    /// Opens (creating if needed) the database and vault directory
    pub async fn open(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.vault.dir)
            .await
            .with_context(|| format!("Failed to create {}", config.vault.dir.display()))?;

        let pool = DatabasePool::new(Path::new(&config.vault.database))
            .await
            .context("Failed to open metadata database")?;

        let store: Arc<dyn IMetadataStore> = Arc::new(SqliteMetadataStore::new(pool.pool().clone()));
        let audit = AuditLogger::new(store.clone());
        let vault = VaultDir::new(config.vault.dir.clone());

        Ok(Self {
            config,
            store,
            audit,
            vault,
        })
    }

    /// Looks up a record, failing with a readable message when absent
    pub async fn require_file(&self, id: &FileId) -> Result<FileRecord> {
        match self.store.get_file_record(id).await? {
            Some(record) => Ok(record),
            None => bail!("No file with id {id}"),
        }
    }

    /// Fails unless `user` owns or holds a grant on `record`
    pub async fn require_access(&self, user: &UserId, record: &FileRecord) -> Result<()> {
        if record.owner_id() == user {
            return Ok(());
        }
        let granted = self
            .store
            .list_permissions(record.id())
            .await?
            .iter()
            .any(|g| &g.user_id == user);
        if !granted {
            bail!("User {user} has no access to file {}", record.id());
        }
        debug!(user = %user, file_id = %record.id(), "Access granted via permission");
        Ok(())
    }

    /// Fails unless `user` owns `record`
    pub fn require_owner(&self, user: &UserId, record: &FileRecord) -> Result<()> {
        if record.owner_id() != user {
            bail!("Only the owner ({}) may do this", record.owner_id());
        }
        Ok(())
    }
}
