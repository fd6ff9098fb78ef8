//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the domain core depends on, but whose
//! implementations live in adapter crates.
//!
//! - [`IRemoteStore`] - Remote file store operations (Google Drive)

pub mod remote_store;

#[cfg(test)]
pub(crate) mod memory;

pub use remote_store::{
    IRemoteStore, KindConstraint, ListPage, ListQuery, StoreError, Tokens, UserInfo,
    MAX_PAGE_SIZE,
};
