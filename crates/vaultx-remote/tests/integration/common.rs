//! Shared helpers for transport integration tests

use std::time::Duration;

use vaultx_core::domain::Credential;
use vaultx_remote::{ApiClient, HttpTransport};
use wiremock::MockServer;

pub const TOKEN: &str = "test-bearer-token";

/// Starts a mock server and returns a transport pointed at it
pub async fn setup() -> (MockServer, HttpTransport) {
    let server = MockServer::start().await;
    let client = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    (server, HttpTransport::new(client))
}

pub fn credential() -> Credential {
    Credential::new(TOKEN).unwrap()
}

pub fn remote_record_json(id: &str, version: u32, modified: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "originalName": format!("{id}.txt"),
        "encryptedName": format!("{id}.enc"),
        "ownerId": "alice",
        "version": version,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "lastModifiedUTC": modified,
        "storagePath": format!("blobs/{id}")
    })
}
