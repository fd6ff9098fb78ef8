//! DriveKeep Drive - Google Drive v3 client
//!
//! Provides async client for:
//! - OAuth2 authentication (installed-app Authorization Code with PKCE)
//! - Listing, reading, creating, copying and deleting Drive files
//! - Bounded retry of throttled and transient failures
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 PKCE authentication flow and token storage
//! - [`client`] - Drive v3 HTTP client
//! - [`query`] - Rendering of listing queries into Drive `q` expressions
//! - [`provider`] - [`IRemoteStore`](drivekeep_core::ports::IRemoteStore) implementation

pub mod auth;
pub mod client;
pub mod provider;
pub mod query;

use std::time::Duration;

use drivekeep_core::ports::StoreError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when communicating with the Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// The request was rejected as invalid (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (429, or 403 with a rate-limit reason)
    #[error("Too many requests: {message}")]
    TooManyRequests {
        message: String,
        /// Delay requested by the server, if any
        retry_after: Option<Duration>,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Error reasons Drive uses on 403 responses that are really throttling
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// `{"error": {...}}` envelope returned by Google APIs
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

impl DriveError {
    /// Classifies a non-success response from its status and body
    pub fn from_response(status: StatusCode, body: &str, retry_after: Option<Duration>) -> Self {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|e| e.error.message.clone())
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body.to_string()
                }
            });
        let rate_limited = parsed.as_ref().is_some_and(|e| {
            e.error
                .errors
                .iter()
                .filter_map(|d| d.reason.as_deref())
                .any(|r| RATE_LIMIT_REASONS.contains(&r))
        });

        match status {
            StatusCode::BAD_REQUEST => DriveError::BadRequest(message),
            StatusCode::UNAUTHORIZED => DriveError::Unauthorized(message),
            StatusCode::FORBIDDEN if rate_limited => DriveError::TooManyRequests {
                message,
                retry_after,
            },
            StatusCode::FORBIDDEN => DriveError::Forbidden(message),
            StatusCode::NOT_FOUND => DriveError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => DriveError::TooManyRequests {
                message,
                retry_after,
            },
            s if s.is_server_error() => DriveError::ServerError {
                status: s.as_u16(),
                message,
            },
            s => DriveError::InvalidResponse(format!("unexpected status {s}: {message}")),
        }
    }

    /// Returns true if the request may succeed when sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            DriveError::TooManyRequests { .. } => true,
            DriveError::ServerError { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            DriveError::NetworkError(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Server-requested delay before retrying
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DriveError::TooManyRequests { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<DriveError> for StoreError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::BadRequest(m) => StoreError::BadRequest(m),
            DriveError::Unauthorized(m) => StoreError::Unauthorized(m),
            DriveError::Forbidden(m) => StoreError::Forbidden(m),
            DriveError::NotFound(m) => StoreError::NotFound(m),
            DriveError::TooManyRequests { message, .. } => StoreError::RateLimited(message),
            DriveError::ServerError { status, message } => {
                StoreError::Server(format!("{status}: {message}"))
            }
            DriveError::NetworkError(e) => StoreError::Network(e.to_string()),
            DriveError::InvalidResponse(m) => StoreError::InvalidResponse(m),
        }
    }
}
