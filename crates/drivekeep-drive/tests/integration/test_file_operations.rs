//! Integration tests for get, create, copy and delete through DriveStore

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use drivekeep_core::domain::{EntryKind, RemoteId};
use drivekeep_core::ports::{IRemoteStore, StoreError};
use drivekeep_drive::client::FILE_FIELDS;
use drivekeep_drive::provider::DriveStore;
use drivekeep_drive::query::FOLDER_MIME_TYPE;

use crate::common;

fn id(s: &str) -> RemoteId {
    RemoteId::new(s).unwrap()
}

#[tokio::test]
async fn test_get_entry() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/abc"))
        .and(query_param("fields", FILE_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::folder_json("abc", "Robotics")))
        .expect(1)
        .mount(&server)
        .await;

    let store = DriveStore::new(client);
    let entry = store.get_entry(&id("abc")).await.expect("get_entry failed");

    assert_eq!(entry.kind, EntryKind::Folder);
    assert_eq!(entry.name, "Robotics");
}

#[tokio::test]
async fn test_create_folder_posts_metadata() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_json(json!({
            "name": "A",
            "mimeType": FOLDER_MIME_TYPE,
            "parents": ["dst"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::folder_json("newA", "A")))
        .expect(1)
        .mount(&server)
        .await;

    let store = DriveStore::new(client);
    let folder = store
        .create_folder(&id("dst"), "A")
        .await
        .expect("create_folder failed");

    assert_eq!(folder.id.as_str(), "newA");
    assert!(folder.is_folder());
}

#[tokio::test]
async fn test_copy_file_posts_parent_and_name() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path("/files/src1/copy"))
        .and(body_json(json!({"name": "file1", "parents": ["folderB"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json(
            "copy1",
            "file1",
            "application/pdf",
            "mirror@hb.edu",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let store = DriveStore::new(client);
    let copy = store
        .copy_file(&id("src1"), &id("folderB"), "file1")
        .await
        .expect("copy_file failed");

    assert_eq!(copy.id.as_str(), "copy1");
    assert_eq!(copy.owners[0].email, "mirror@hb.edu");
}

#[tokio::test]
async fn test_copy_rejection_maps_to_bad_request() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path("/files/src1/copy"))
        .respond_with(ResponseTemplate::new(400).set_body_json(common::error_json(
            400,
            "cannotCopyFile",
            "This file cannot be copied by the user.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let store = DriveStore::new(client);
    let err = store
        .copy_file(&id("src1"), &id("folderB"), "file1")
        .await
        .unwrap_err();

    assert!(err.is_rejection());
    assert_eq!(
        err,
        StoreError::BadRequest("This file cannot be copied by the user.".to_string())
    );
}

#[tokio::test]
async fn test_delete_entry() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/files/alias1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = DriveStore::new(client);
    store
        .delete_entry(&id("alias1"))
        .await
        .expect("delete_entry failed");
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(common::error_json(
            404,
            "notFound",
            "File not found: missing.",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/locked"))
        .respond_with(ResponseTemplate::new(403).set_body_json(common::error_json(
            403,
            "insufficientFilePermissions",
            "The user does not have sufficient permissions for this file.",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(common::error_json(
            401,
            "authError",
            "Invalid Credentials",
        )))
        .mount(&server)
        .await;

    let store = DriveStore::new(client);

    let err = store.get_entry(&id("missing")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    let err = store.get_entry(&id("locked")).await.unwrap_err();
    assert!(matches!(err, StoreError::Forbidden(_)));
    let err = store.get_entry(&id("expired")).await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(ref m) if m == "Invalid Credentials"));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/weird"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let store = DriveStore::new(client);
    let err = store.get_entry(&id("weird")).await.unwrap_err();

    assert!(matches!(err, StoreError::InvalidResponse(_)));
}
