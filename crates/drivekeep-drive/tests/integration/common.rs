//! Shared test helpers for Drive API integration tests
//!
//! Provides wiremock-based mock server setup for Drive v3 endpoints. Each
//! helper mounts the necessary mock endpoints; clients point at the mock
//! server and retry with millisecond delays.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivekeep_drive::client::{DriveClient, RetryPolicy};
use drivekeep_drive::query::{FOLDER_MIME_TYPE, SHORTCUT_MIME_TYPE};

/// Retry policy with delays short enough for tests
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    }
}

/// Starts a mock server with `GET /about` mounted and returns a client for it
pub async fn setup_drive_mock() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .and(query_param("fields", "user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {
                "kind": "drive#user",
                "displayName": "Mirror Account",
                "emailAddress": "mirror@hb.edu"
            }
        })))
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url("test-access-token", server.uri())
        .with_retry_policy(fast_retry(3));

    (server, client)
}

pub fn file_json(id: &str, name: &str, mime: &str, owner: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": mime,
        "owners": [{"emailAddress": owner, "displayName": owner}]
    })
}

pub fn folder_json(id: &str, name: &str) -> Value {
    file_json(id, name, FOLDER_MIME_TYPE, "mirror@hb.edu")
}

pub fn shortcut_json(id: &str, name: &str, target: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": SHORTCUT_MIME_TYPE,
        "owners": [{"emailAddress": "mirror@hb.edu"}],
        "shortcutDetails": {"targetId": target, "targetMimeType": "application/pdf"}
    })
}

/// Mounts one page of `files.list` for the given query
///
/// Pages requested with `page_token` take priority over the first page mock.
pub async fn mount_list_page(
    server: &MockServer,
    q: &str,
    page_token: Option<&str>,
    files: Value,
    next_page_token: Option<&str>,
) {
    let mut body = json!({ "files": files });
    if let Some(next) = next_page_token {
        body["nextPageToken"] = json!(next);
    }

    let mut mock = Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", q))
        .and(query_param("orderBy", "name"));
    let priority = match page_token {
        Some(token) => {
            mock = mock.and(query_param("pageToken", token));
            1
        }
        None => 5,
    };

    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .with_priority(priority)
        .mount(server)
        .await;
}

/// Google-style error body
pub fn error_json(code: u16, reason: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{"domain": "global", "reason": reason, "message": message}]
        }
    })
}
