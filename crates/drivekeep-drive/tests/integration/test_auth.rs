//! Integration tests for token refresh and stored-token handling

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivekeep_core::ports::Tokens;
use drivekeep_drive::auth::{DriveAuthAdapter, OAuth2Config, TokenStorage};

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn adapter(server: &MockServer, storage: TokenStorage) -> DriveAuthAdapter {
    let mut config =
        OAuth2Config::new("client-id").with_token_url(format!("{}/token", server.uri()));
    config.client_secret = Some("client-secret".to_string());
    DriveAuthAdapter::new(config, storage)
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let auth = adapter(&server, TokenStorage::File(dir.path().join("tokens.json")));

    let tokens = auth.refresh("stored-refresh").await.expect("refresh failed");

    assert_eq!(tokens.access_token, "fresh-access");
    assert_eq!(tokens.refresh_token.as_deref(), Some("stored-refresh"));
    assert!(tokens.expires_at > Utc::now() + Duration::minutes(55));
}

#[tokio::test]
async fn test_authorize_refreshes_expired_token_and_persists_it() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let storage = TokenStorage::File(dir.path().join("tokens.json"));
    storage
        .store(&Tokens {
            access_token: "stale-access".to_string(),
            refresh_token: Some("stored-refresh".to_string()),
            expires_at: Utc::now() - Duration::minutes(5),
        })
        .unwrap();

    let auth = adapter(&server, storage.clone());
    let tokens = auth.authorize().await.expect("authorize failed");

    assert_eq!(tokens.access_token, "fresh-access");
    let persisted = storage.load().unwrap().expect("tokens were not stored");
    assert_eq!(persisted.access_token, "fresh-access");
    assert_eq!(persisted.refresh_token.as_deref(), Some("stored-refresh"));
}

#[tokio::test]
async fn test_authorize_uses_valid_stored_token_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let storage = TokenStorage::File(dir.path().join("tokens.json"));
    storage
        .store(&Tokens {
            access_token: "still-good".to_string(),
            refresh_token: Some("stored-refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        })
        .unwrap();

    let tokens = adapter(&server, storage).authorize().await.unwrap();

    assert_eq!(tokens.access_token, "still-good");
}

#[tokio::test]
async fn test_logout_removes_token_file() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("nested").join("tokens.json");
    let storage = TokenStorage::File(file.clone());
    storage
        .store(&Tokens {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Utc::now(),
        })
        .unwrap();
    assert!(file.exists());

    let auth = adapter(&server, storage);
    auth.logout().unwrap();
    assert!(!file.exists());
    // a second logout is a no-op
    auth.logout().unwrap();
}
