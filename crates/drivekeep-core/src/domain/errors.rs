//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! such as identifier and path validation failures.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// A path segment is empty or contains a separator
    #[error("Invalid path segment: {0:?}")]
    InvalidSegment(String),

    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// Invalid domain name in the allow-list
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
