//! `POST /login` token exchange

use std::time::Duration;

use vaultx_remote::{ApiClient, RemoteError};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    (server, client)
}

#[tokio::test]
async fn test_login_returns_credential() {
    let (server, client) = client().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(serde_json::json!({
            "username": "alice",
            "password": "s3cret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "session-abc",
            "user": {"id": "alice", "role": "user"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = client.login("alice", "s3cret").await.unwrap();
    assert_eq!(credential.expose(), "session-abc");
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = client().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let err = client.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized(_)));
}

#[tokio::test]
async fn test_login_without_token_is_invalid_response() {
    let (server, client) = client().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": ""})))
        .mount(&server)
        .await;

    let err = client.login("alice", "s3cret").await.unwrap_err();
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
}
