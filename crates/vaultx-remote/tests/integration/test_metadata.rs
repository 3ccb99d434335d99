//! Metadata endpoints: listing, persisting, signed-URL requests

use chrono::{TimeZone, Utc};
use vaultx_core::domain::{FileId, FileRecord, UserId};
use vaultx_core::ports::ITransport;
use vaultx_remote::RemoteError;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_list_remote_records() {
    let (server, transport) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer test-bearer-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            common::remote_record_json("f1", 3, "2024-02-01T10:00:00.000Z"),
            common::remote_record_json("f2", 1, "2024-02-02T10:00:00.000Z"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let listing = transport
        .list_remote_records(&common::credential())
        .await
        .unwrap();
    let records = &listing.records;

    assert!(listing.rejected.is_empty());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id().as_str(), "f1");
    assert_eq!(records[0].version(), 3);
    assert_eq!(records[0].storage_path(), Some("blobs/f1"));
    assert_eq!(
        records[1].last_modified_utc(),
        Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_list_isolates_malformed_record() {
    let (server, transport) = common::setup().await;

    let mut bad = common::remote_record_json("f2", 1, "2024-02-02T10:00:00.000Z");
    bad["encryptedName"] = serde_json::json!("alice/f2.enc");
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            common::remote_record_json("f1", 3, "2024-02-01T10:00:00.000Z"),
            bad,
        ])))
        .mount(&server)
        .await;

    let listing = transport
        .list_remote_records(&common::credential())
        .await
        .unwrap();

    assert_eq!(listing.records.len(), 1);
    assert_eq!(listing.records[0].id().as_str(), "f1");
    assert_eq!(listing.rejected.len(), 1);
    assert_eq!(
        listing.rejected[0].id,
        Some(FileId::new("f2".to_string()).unwrap())
    );
}

#[tokio::test]
async fn test_list_unauthorized() {
    let (server, transport) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let err = transport
        .list_remote_records(&common::credential())
        .await
        .unwrap_err();

    match err.downcast_ref::<RemoteError>() {
        Some(RemoteError::Unauthorized(body)) => assert_eq!(body, "token expired"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_invalid_body() {
    let (server, transport) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = transport
        .list_remote_records(&common::credential())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_persist_metadata_posts_wire_record() {
    let (server, transport) = common::setup().await;

    let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let record = FileRecord::new(
        FileId::new("f9".to_string()).unwrap(),
        "plan.md",
        "f9.enc",
        UserId::new("alice".to_string()).unwrap(),
    )
    .unwrap()
    .with_version(2)
    .unwrap()
    .with_created_at(t)
    .with_last_modified(t)
    .with_storage_path("blobs/f9");

    Mock::given(method("POST"))
        .and(path("/files/metadata"))
        .and(header("authorization", "Bearer test-bearer-token"))
        .and(body_json(serde_json::json!({
            "id": "f9",
            "originalName": "plan.md",
            "encryptedName": "f9.enc",
            "ownerId": "alice",
            "version": 2,
            "createdAt": "2024-03-01T09:30:00Z",
            "lastModifiedUTC": "2024-03-01T09:30:00Z",
            "storagePath": "blobs/f9"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    transport
        .persist_remote_metadata(&record, &common::credential())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_request_upload_target() {
    let (server, transport) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files/upload-url"))
        .and(body_json(serde_json::json!({"fileName": "abc.enc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "signedUrl": format!("{}/storage/abc?sig=1", server.uri()),
            "path": "blobs/abc.enc"
        })))
        .mount(&server)
        .await;

    let target = transport
        .request_upload_target("abc.enc", &common::credential())
        .await
        .unwrap();

    assert_eq!(target.storage_path, "blobs/abc.enc");
    assert!(target.write_locator.ends_with("/storage/abc?sig=1"));
}

#[tokio::test]
async fn test_request_download_locator_not_found() {
    let (server, transport) = common::setup().await;

    Mock::given(method("POST"))
        .and(path("/files/download-url"))
        .and(body_json(serde_json::json!({"storagePath": "blobs/gone"})))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = transport
        .request_download_locator("blobs/gone", &common::credential())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::NotFound(_))
    ));
}
