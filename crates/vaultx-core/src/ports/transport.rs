//! Transport port
//!
//! Defines the [`ITransport`] trait: the remote metadata service plus blob
//! transfer through pre-signed locators. Every call is a fallible network
//! operation; any non-success is reported as `Err`.

use serde::{Deserialize, Serialize};

use crate::domain::{Credential, FileId, FileRecord};

/// Where to PUT a blob, and the locator it will have once stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// Pre-signed write locator (e.g. a URL)
    pub write_locator: String,
    /// Opaque remote storage path to record on the file
    pub storage_path: String,
}

/// Where to GET a stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLocator {
    /// Pre-signed read locator (e.g. a URL)
    pub read_locator: String,
}

/// A remote entry that did not decode into a valid [`FileRecord`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// The entry's id, when it carried a usable one
    pub id: Option<FileId>,
    pub reason: String,
}

/// The remote file list, split into usable and rejected entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteListing {
    pub records: Vec<FileRecord>,
    pub rejected: Vec<RejectedRecord>,
}

/// Remote metadata and blob store
#[async_trait::async_trait]
pub trait ITransport: Send + Sync {
    /// Requests a write target for the blob named `blob_name`
    async fn request_upload_target(
        &self,
        blob_name: &str,
        credential: &Credential,
    ) -> anyhow::Result<UploadTarget>;

    /// Requests a read locator for a stored blob
    async fn request_download_locator(
        &self,
        storage_path: &str,
        credential: &Credential,
    ) -> anyhow::Result<DownloadLocator>;

    /// Writes bytes to a write locator
    async fn put_bytes(&self, write_locator: &str, bytes: Vec<u8>) -> anyhow::Result<()>;

    /// Reads bytes from a read locator
    async fn get_bytes(&self, read_locator: &str) -> anyhow::Result<Vec<u8>>;

    /// The authoritative remote file list
    ///
    /// A malformed entry is returned in [`RemoteListing::rejected`]; only a
    /// failed request or an unreadable body is an `Err`.
    async fn list_remote_records(&self, credential: &Credential)
        -> anyhow::Result<RemoteListing>;

    /// Stores a record in the remote metadata service
    async fn persist_remote_metadata(
        &self,
        record: &FileRecord,
        credential: &Credential,
    ) -> anyhow::Result<()>;
}
