//! Remote store port (driven/secondary port)
//!
//! This module defines the interface for interacting with the hierarchical
//! remote file store. The production implementation targets Google Drive v3
//! (see the `drivekeep-drive` crate), but the trait only speaks in terms of
//! [`RemoteEntry`] values and kind constraints.
//!
//! ## Design Notes
//!
//! - Errors are classified in [`StoreError`] because the use cases must tell
//!   request rejections (recorded and skipped) apart from everything else
//!   (escalated).
//! - Uses `#[async_trait]` for async trait methods.
//! - Retries of transient failures are the adapter's responsibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{RemoteEntry, RemoteId};

/// Maximum page size accepted by the store for child listings
pub const MAX_PAGE_SIZE: u32 = 1000;

// ============================================================================
// Tokens
// ============================================================================

/// OAuth tokens received from the store's identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for refreshing the access token without user interaction
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// Information about the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    pub display_name: String,
}

// ============================================================================
// Listing
// ============================================================================

/// Constraint on the kinds of children returned by a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindConstraint {
    /// All kinds
    Any,
    /// Folders and aliases (anything that may lead to more children)
    FolderLike,
    /// Folders only
    FolderOnly,
}

impl KindConstraint {
    /// Returns true if an entry of the given kind passes the constraint
    pub fn admits(&self, entry: &RemoteEntry) -> bool {
        match self {
            KindConstraint::Any => true,
            KindConstraint::FolderLike => entry.is_folder() || entry.is_alias(),
            KindConstraint::FolderOnly => entry.is_folder(),
        }
    }
}

/// Parameters for listing the children of a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Folder whose direct children are listed
    pub parent: RemoteId,
    pub kind: KindConstraint,
    /// Additional store-specific query clauses, ANDed with the rest
    pub extra_clauses: Vec<String>,
    /// Requested page size (clamped to [`MAX_PAGE_SIZE`])
    pub page_size: u32,
    /// Whether trashed entries are included
    pub include_trashed: bool,
}

impl ListQuery {
    pub fn children_of(parent: RemoteId) -> Self {
        Self {
            parent,
            kind: KindConstraint::Any,
            extra_clauses: Vec::new(),
            page_size: MAX_PAGE_SIZE,
            include_trashed: false,
        }
    }

    pub fn with_kind(mut self, kind: KindConstraint) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_extra_clauses(mut self, clauses: &[String]) -> Self {
        self.extra_clauses = clauses.to_vec();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_trashed(mut self, include_trashed: bool) -> Self {
        self.include_trashed = include_trashed;
        self
    }
}

/// One page of a child listing, ordered by name
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<RemoteEntry>,
    /// Continuation token; `None` on the last page
    pub next_page_token: Option<String>,
}

// ============================================================================
// StoreError
// ============================================================================

/// Classified failure of a remote store call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store rejected the request as malformed or not applicable
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The requested entry does not exist (or is not visible)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials are missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limit still exceeded after retries
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// A server-side error persisted after retries (5xx)
    #[error("Server error: {0}")]
    Server(String),

    /// A network-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The response could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Returns true for rejection-class failures
    ///
    /// Rejections concern one specific item and are recorded as non-fatal;
    /// every other class is escalated.
    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::BadRequest(_))
    }
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for remote store operations
///
/// All methods assume valid credentials are available; acquiring and
/// refreshing them happens once at process start.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Lists one page of the children of `query.parent`
    ///
    /// Entries are ordered by name. Pass the previous page's
    /// `next_page_token` to continue.
    async fn list_children(
        &self,
        query: &ListQuery,
        page_token: Option<&str>,
    ) -> Result<ListPage, StoreError>;

    /// Retrieves an entry by identifier
    async fn get_entry(&self, id: &RemoteId) -> Result<RemoteEntry, StoreError>;

    /// Creates a folder named `name` under `parent`
    async fn create_folder(&self, parent: &RemoteId, name: &str)
        -> Result<RemoteEntry, StoreError>;

    /// Copies file `file` into `dest_parent` under `name`
    async fn copy_file(
        &self,
        file: &RemoteId,
        dest_parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteEntry, StoreError>;

    /// Deletes an entry permanently
    async fn delete_entry(&self, id: &RemoteId) -> Result<(), StoreError>;

    /// Retrieves information about the authenticated user
    async fn get_user_info(&self) -> Result<UserInfo, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RemoteId {
        RemoteId::new(s).unwrap()
    }

    #[test]
    fn test_kind_constraint_admits() {
        let folder = RemoteEntry::folder(id("f"), "f");
        let alias = RemoteEntry::alias(id("a"), "a", id("t"));
        let file = RemoteEntry::file(id("x"), "x", Vec::new());

        assert!(KindConstraint::Any.admits(&file));
        assert!(KindConstraint::FolderLike.admits(&folder));
        assert!(KindConstraint::FolderLike.admits(&alias));
        assert!(!KindConstraint::FolderLike.admits(&file));
        assert!(KindConstraint::FolderOnly.admits(&folder));
        assert!(!KindConstraint::FolderOnly.admits(&alias));
    }

    #[test]
    fn test_list_query_builder() {
        let query = ListQuery::children_of(id("p"))
            .with_kind(KindConstraint::FolderOnly)
            .with_page_size(5000)
            .with_extra_clauses(&["starred = true".to_string()]);

        assert_eq!(query.page_size, MAX_PAGE_SIZE);
        assert_eq!(query.kind, KindConstraint::FolderOnly);
        assert_eq!(query.extra_clauses.len(), 1);
        assert!(!query.include_trashed);
        assert_eq!(query.clone().with_page_size(0).page_size, 1);
    }

    #[test]
    fn test_store_error_rejection_class() {
        assert!(StoreError::BadRequest("x".into()).is_rejection());
        assert!(!StoreError::NotFound("x".into()).is_rejection());
        assert!(!StoreError::Forbidden("x".into()).is_rejection());
        assert!(!StoreError::Server("x".into()).is_rejection());
    }

    #[test]
    fn test_tokens_expiry() {
        let tokens = Tokens {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::minutes(2),
        };
        assert!(!tokens.is_expired());
        assert!(tokens.expires_within(chrono::Duration::minutes(5)));
        assert!(!tokens.expires_within(chrono::Duration::seconds(10)));
    }
}
