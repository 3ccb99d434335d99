//! Blob transfer through pre-signed URLs

use vaultx_core::ports::ITransport;
use vaultx_remote::RemoteError;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_put_bytes_without_bearer() {
    let (server, transport) = common::setup().await;
    let payload = vec![0x49, 0x49, 0x43, 0x31, 0, 1, 2, 3];

    Mock::given(method("PUT"))
        .and(path("/storage/blob-1"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(payload.clone()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/storage/blob-1", server.uri());
    transport.put_bytes(&url, payload).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_get_bytes() {
    let (server, transport) = common::setup().await;
    let content: Vec<u8> = (0..4096).map(|i| (i % 256) as u8).collect();

    Mock::given(method("GET"))
        .and(path("/storage/blob-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.clone())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/storage/blob-2", server.uri());
    let data = transport.get_bytes(&url).await.unwrap();
    assert_eq!(data, content);
}

#[tokio::test]
async fn test_get_bytes_server_error() {
    let (server, transport) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/storage/blob-3"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let url = format!("{}/storage/blob-3", server.uri());
    let err = transport.get_bytes(&url).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::ServerError { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_put_bytes_forbidden() {
    let (server, transport) = common::setup().await;

    Mock::given(method("PUT"))
        .and(path("/storage/expired"))
        .respond_with(ResponseTemplate::new(403).set_body_string("signature expired"))
        .mount(&server)
        .await;

    let url = format!("{}/storage/expired", server.uri());
    let err = transport.put_bytes(&url, vec![1, 2, 3]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::Forbidden(_))
    ));
}
