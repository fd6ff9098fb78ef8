//! Google Drive v3 API client
//!
//! Provides a typed HTTP client for the Drive v3 `files` and `about`
//! resources. Handles authentication headers, JSON deserialization, error
//! classification and bounded retry of throttled or transient failures.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivekeep_drive::client::DriveClient;
//!
//! # async fn example() -> Result<(), drivekeep_drive::DriveError> {
//! let client = DriveClient::new("access-token-here");
//! let user = client.get_user_info().await?;
//! println!("Signed in as {}", user.email);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use drivekeep_core::ports::UserInfo;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::query::FOLDER_MIME_TYPE;
use crate::DriveError;

/// Base URL for Google Drive API v3
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Fields requested for a single file
pub const FILE_FIELDS: &str = "id, name, mimeType, owners, shortcutDetails";

/// Fields requested for a listing page
pub const FILE_LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, owners, shortcutDetails)";

/// Upper bound on a server-requested Retry-After delay
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

// ============================================================================
// Drive API response types
// ============================================================================

/// A file resource as returned by the Drive API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub mime_type: Option<String>,
    #[serde(default)]
    pub owners: Vec<DriveUser>,
    pub shortcut_details: Option<ShortcutDetails>,
}

/// A user as embedded in file owners and the `about` resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveUser {
    pub email_address: Option<String>,
    pub display_name: Option<String>,
}

/// Shortcut target information
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDetails {
    pub target_id: Option<String>,
    pub target_mime_type: Option<String>,
}

/// One page of `files.list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// Response of `GET /about?fields=user`
#[derive(Debug, Deserialize)]
struct AboutResponse {
    user: Option<DriveUser>,
}

/// Request body for folder creation and copies
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    parents: [&'a str; 1],
}

// ============================================================================
// RetryPolicy
// ============================================================================

/// Bounded exponential backoff for retryable failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further one
    pub base_delay: Duration,
    /// Upper bound on the computed delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(64),
        }
    }
}

impl RetryPolicy {
    /// Disables retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Parses a `Retry-After` value given either in seconds or as an HTTP date
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER));
    }

    let date = chrono::DateTime::parse_from_rfc2822(value.trim()).ok()?;
    let diff = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
    let secs: u64 = diff.num_seconds().try_into().unwrap_or(0);
    Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Drive v3 API calls
///
/// Wraps `reqwest::Client` with the bearer token, base URL construction and
/// the retry policy applied to every call.
pub struct DriveClient {
    client: Client,
    base_url: String,
    access_token: String,
    retry: RetryPolicy,
}

impl DriveClient {
    /// Creates a new DriveClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DRIVE_BASE_URL)
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DriveClient access token");
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Creates an authenticated request builder for the given method and path
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Sends the request produced by `build`, retrying per the retry policy
    ///
    /// `build` is called once per attempt. A success response is returned
    /// as-is; any other status is classified into a [`DriveError`].
    pub async fn execute_with_retry<F>(&self, what: &str, build: F) -> Result<Response, DriveError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let err = match build().send().await {
                Ok(response) if response.status().is_success() => {
                    if attempt > 0 {
                        info!(what, attempt, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after);
                    let body = response.text().await.unwrap_or_default();
                    DriveError::from_response(status, &body, retry_after)
                }
                Err(e) => DriveError::NetworkError(e),
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= self.retry.max_retries {
                warn!(what, attempts = attempt + 1, error = %err, "Retry limit exhausted");
                return Err(err);
            }

            let delay = err
                .retry_after()
                .unwrap_or_else(|| self.retry.backoff(attempt));
            info!(
                what,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Request failed, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        response: Response,
    ) -> Result<T, DriveError> {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| DriveError::InvalidResponse(format!("{what}: {e}")))
    }

    /// Lists one page of files matching `q`, ordered by name
    pub async fn list_files(
        &self,
        q: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FileList, DriveError> {
        debug!(q, page_size, has_token = page_token.is_some(), "Listing files");
        let page_size = page_size.to_string();

        let response = self
            .execute_with_retry("files.list", || {
                let mut params: Vec<(&str, &str)> = vec![
                    ("q", q),
                    ("pageSize", page_size.as_str()),
                    ("orderBy", "name"),
                    ("fields", FILE_LIST_FIELDS),
                ];
                if let Some(token) = page_token {
                    params.push(("pageToken", token));
                }
                self.request(Method::GET, "/files").query(&params)
            })
            .await?;

        self.json("files.list", response).await
    }

    /// Fetches a single file by id
    pub async fn get_file(&self, id: &str) -> Result<DriveFile, DriveError> {
        debug!(id, "Getting file");
        let path = format!("/files/{id}");
        let response = self
            .execute_with_retry("files.get", || {
                self.request(Method::GET, &path)
                    .query(&[("fields", FILE_FIELDS)])
            })
            .await?;
        self.json("files.get", response).await
    }

    /// Creates a folder named `name` under `parent`
    pub async fn create_folder(&self, parent: &str, name: &str) -> Result<DriveFile, DriveError> {
        debug!(parent, name, "Creating folder");
        let body = FileMetadata {
            name,
            mime_type: Some(FOLDER_MIME_TYPE),
            parents: [parent],
        };
        let response = self
            .execute_with_retry("files.create", || {
                self.request(Method::POST, "/files")
                    .query(&[("fields", FILE_FIELDS)])
                    .json(&body)
            })
            .await?;
        self.json("files.create", response).await
    }

    /// Copies file `id` into `parent` under `name`
    pub async fn copy_file(
        &self,
        id: &str,
        parent: &str,
        name: &str,
    ) -> Result<DriveFile, DriveError> {
        debug!(id, parent, name, "Copying file");
        let path = format!("/files/{id}/copy");
        let body = FileMetadata {
            name,
            mime_type: None,
            parents: [parent],
        };
        let response = self
            .execute_with_retry("files.copy", || {
                self.request(Method::POST, &path)
                    .query(&[("fields", FILE_FIELDS)])
                    .json(&body)
            })
            .await?;
        self.json("files.copy", response).await
    }

    /// Permanently deletes file `id`
    pub async fn delete_file(&self, id: &str) -> Result<(), DriveError> {
        debug!(id, "Deleting file");
        let path = format!("/files/{id}");
        self.execute_with_retry("files.delete", || self.request(Method::DELETE, &path))
            .await?;
        Ok(())
    }

    /// Retrieves the authenticated user
    pub async fn get_user_info(&self) -> Result<UserInfo, DriveError> {
        debug!("Fetching user from /about");
        let response = self
            .execute_with_retry("about.get", || {
                self.request(Method::GET, "/about")
                    .query(&[("fields", "user")])
            })
            .await?;
        let about: AboutResponse = self.json("about.get", response).await?;
        let user = about
            .user
            .ok_or_else(|| DriveError::InvalidResponse("about: missing user".to_string()))?;

        Ok(UserInfo {
            email: user.email_address.unwrap_or_default(),
            display_name: user.display_name.unwrap_or_default(),
        })
    }
}
