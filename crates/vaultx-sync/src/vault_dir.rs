//! Vault directory of ciphertext blobs
//!
//! A flat directory holding one file per `FileRecord`, named by its
//! `encrypted_name`. Writes go to `<name>.tmp` first and are renamed into
//! place, so readers never observe a partially written blob.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use vaultx_core::domain::validate_blob_name;

use crate::SyncError;

#[derive(Debug, Clone)]
pub struct VaultDir {
    root: PathBuf,
}

impl VaultDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a blob
    ///
    /// # Errors
    /// `SyncError::Domain` if `name` is not a plain file name.
    pub fn path(&self, name: &str) -> Result<PathBuf, SyncError> {
        validate_blob_name(name)?;
        Ok(self.root.join(name))
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, SyncError> {
        let data = tokio::fs::read(self.path(name)?).await?;
        debug!(bytes = data.len(), "blob read");
        Ok(data)
    }

    /// Atomically replaces the blob `name` with `data`
    #[instrument(skip(self, data), fields(root = %self.root.display(), bytes = data.len()))]
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<(), SyncError> {
        let target = self.path(name)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let tmp_path = {
            let mut p = target.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };

        tokio::fs::write(&tmp_path, data).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &target).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        debug!("blob written");
        Ok(())
    }

    /// Removes a blob; returns `false` if it did not exist
    pub async fn remove(&self, name: &str) -> Result<bool, SyncError> {
        match tokio::fs::remove_file(self.path(name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, name: &str) -> bool {
        match self.path(name) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
