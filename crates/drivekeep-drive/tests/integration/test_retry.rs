//! Integration tests for bounded retry of throttled and failing requests

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use drivekeep_drive::client::DriveClient;
use drivekeep_drive::DriveError;

use crate::common;

const Q: &str = "'root1' in parents and trashed = false";

async fn mount_success(server: &wiremock::MockServer) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_429_is_retried_honouring_retry_after() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_success(&server).await;

    let list = client.list_files(Q, 100, None).await.expect("should succeed after retries");

    assert!(list.files.is_empty());
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_success(&server).await;

    client.list_files(Q, 100, None).await.expect("should succeed after retry");
}

#[tokio::test]
async fn test_rate_limit_403_is_retried() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(403).set_body_json(common::error_json(
            403,
            "userRateLimitExceeded",
            "User Rate Limit Exceeded",
        )))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_success(&server).await;

    client.list_files(Q, 100, None).await.expect("should succeed after retry");
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = wiremock::MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url("token", server.uri())
        .with_retry_policy(common::fast_retry(2));
    let err = client.list_files(Q, 100, None).await.unwrap_err();

    assert!(matches!(err, DriveError::ServerError { status: 500, .. }));
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let (server, client) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path("/files/f1/copy"))
        .respond_with(ResponseTemplate::new(400).set_body_json(common::error_json(
            400,
            "badRequest",
            "Bad Request",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.copy_file("f1", "p1", "name").await.unwrap_err();

    assert!(matches!(err, DriveError::BadRequest(_)));
}

#[tokio::test]
async fn test_connection_failure_is_retried_then_reported() {
    // nothing listens on this port once the server is dropped
    let uri = {
        let server = wiremock::MockServer::start().await;
        server.uri()
    };
    let client =
        DriveClient::with_base_url("token", uri).with_retry_policy(common::fast_retry(1));

    let err = client.list_files(Q, 100, None).await.unwrap_err();

    assert!(matches!(err, DriveError::NetworkError(_)));
}
