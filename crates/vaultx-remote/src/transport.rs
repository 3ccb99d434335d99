//! HttpTransport - ITransport over the REST API
//!
//! | Operation                  | Request                                   |
//! |----------------------------|-------------------------------------------|
//! | `request_upload_target`    | `POST /files/upload-url {fileName}`       |
//! | `request_download_locator` | `POST /files/download-url {storagePath}`  |
//! | `list_remote_records`      | `GET /files`                              |
//! | `persist_remote_metadata`  | `POST /files/metadata <FileRecord>`       |
//! | `put_bytes` / `get_bytes`  | `PUT` / `GET` on the pre-signed URL       |

use reqwest::{header::CONTENT_TYPE, Method};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use vaultx_core::{
    domain::{Credential, FileId, FileRecord},
    ports::{DownloadLocator, ITransport, RejectedRecord, RemoteListing, UploadTarget},
};

use crate::client::ApiClient;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlRequest<'a> {
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlResponse {
    signed_url: String,
    path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadUrlRequest<'a> {
    storage_path: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadUrlResponse {
    signed_url: String,
}

/// Decodes each listed entry on its own so one bad record stays isolated
fn split_entries(entries: Vec<serde_json::Value>) -> RemoteListing {
    let mut listing = RemoteListing::default();
    for entry in entries {
        let id = entry
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| FileId::new(s.to_string()).ok());
        match serde_json::from_value::<FileRecord>(entry) {
            Ok(record) => listing.records.push(record),
            Err(e) => {
                warn!(file_id = ?id, error = %e, "Rejected remote record");
                listing.rejected.push(RejectedRecord {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }
    listing
}

/// `ITransport` implementation backed by [`ApiClient`]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ApiClient,
}

impl HttpTransport {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl ITransport for HttpTransport {
    async fn request_upload_target(
        &self,
        blob_name: &str,
        credential: &Credential,
    ) -> anyhow::Result<UploadTarget> {
        let request = self
            .client
            .request(Method::POST, "/files/upload-url", credential)
            .json(&UploadUrlRequest {
                file_name: blob_name,
            });
        let response: UploadUrlResponse = self.client.send_json(request).await?;
        Ok(UploadTarget {
            write_locator: response.signed_url,
            storage_path: response.path,
        })
    }

    async fn request_download_locator(
        &self,
        storage_path: &str,
        credential: &Credential,
    ) -> anyhow::Result<DownloadLocator> {
        let request = self
            .client
            .request(Method::POST, "/files/download-url", credential)
            .json(&DownloadUrlRequest { storage_path });
        let response: DownloadUrlResponse = self.client.send_json(request).await?;
        Ok(DownloadLocator {
            read_locator: response.signed_url,
        })
    }

    async fn put_bytes(&self, write_locator: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        let len = bytes.len();
        let request = self
            .client
            .absolute(Method::PUT, write_locator)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        self.client.send(request).await?;
        debug!(bytes = len, "Blob uploaded");
        Ok(())
    }

    async fn get_bytes(&self, read_locator: &str) -> anyhow::Result<Vec<u8>> {
        let request = self.client.absolute(Method::GET, read_locator);
        let bytes = self.client.send(request).await?.bytes().await?;
        debug!(bytes = bytes.len(), "Blob downloaded");
        Ok(bytes.to_vec())
    }

    async fn list_remote_records(
        &self,
        credential: &Credential,
    ) -> anyhow::Result<RemoteListing> {
        let request = self.client.request(Method::GET, "/files", credential);
        let entries: Vec<serde_json::Value> = self.client.send_json(request).await?;
        let listing = split_entries(entries);
        debug!(
            count = listing.records.len(),
            rejected = listing.rejected.len(),
            "Fetched remote records"
        );
        Ok(listing)
    }

    async fn persist_remote_metadata(
        &self,
        record: &FileRecord,
        credential: &Credential,
    ) -> anyhow::Result<()> {
        let request = self
            .client
            .request(Method::POST, "/files/metadata", credential)
            .json(record);
        self.client.send(request).await?;
        Ok(())
    }
}
