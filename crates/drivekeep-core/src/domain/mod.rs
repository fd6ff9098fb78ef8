//! Domain entities and business logic
//!
//! This module contains the core domain types for drivekeep:
//! - Newtypes for validated identifiers
//! - Remote entries and their path-qualified form
//! - Ownership classification against a domain allow-list
//! - Domain-specific error types

pub mod entry;
pub mod errors;
pub mod newtypes;
pub mod ownership;

// Re-export commonly used types
pub use entry::{EntryKind, Owner, PathEntry, RemoteEntry};
pub use errors::DomainError;
pub use newtypes::RemoteId;
pub use ownership::DomainAllowList;
