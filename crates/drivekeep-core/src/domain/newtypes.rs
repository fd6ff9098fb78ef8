//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for remote identifiers and path segments.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// RemoteId
// ============================================================================

/// Opaque identifier of an entry in the remote store
///
/// Drive identifiers are URL-safe strings (letters, digits, `-` and `_`).
/// Validation rejects anything else so that identifiers can be embedded in
/// request paths and query literals without surprises.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains invalid characters
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// Path segments
// ============================================================================

/// Checks that a name can be used as a single path segment.
///
/// Remote stores allow `/` inside names, but a configured path label is split
/// on `/`, so a segment must be non-empty and free of separators.
pub fn validate_segment(segment: &str) -> Result<(), DomainError> {
    if segment.is_empty() || segment.contains('/') {
        return Err(DomainError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

/// Splits a slash-separated path label (`"Robotics/2024"`) into segments.
///
/// Leading, trailing and repeated separators are ignored, so `""` and `"/"`
/// both yield an empty path.
pub fn split_path(label: &str) -> Vec<String> {
    label
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins path segments back into a display string.
pub fn join_path(segments: &[String]) -> String {
    segments.join("/")
}
