//! Ownership classification
//!
//! Entries owned by at least one account in an allow-listed organizational
//! domain are left alone; everything else is a candidate for mirroring.

use std::collections::BTreeSet;

use super::entry::RemoteEntry;
use super::errors::DomainError;

/// Set of organizational domains whose files are considered "ours"
///
/// Domains are stored lower-cased and compared for exact equality against
/// the part of an owner's email after the last `@`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainAllowList {
    domains: BTreeSet<String>,
}

impl DomainAllowList {
    /// Builds an allow-list from domain names
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidDomain`] for empty names or names
    /// containing `@` or whitespace.
    pub fn new<I, S>(domains: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for domain in domains {
            let domain = domain.as_ref().trim();
            if domain.is_empty() || domain.contains('@') || domain.contains(char::is_whitespace)
            {
                return Err(DomainError::InvalidDomain(domain.to_string()));
            }
            set.insert(domain.to_ascii_lowercase());
        }
        Ok(Self { domains: set })
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(&domain.to_ascii_lowercase())
    }

    /// Returns true if any owner of `entry` belongs to an allowed domain
    pub fn is_allowed(&self, entry: &RemoteEntry) -> bool {
        entry
            .owners
            .iter()
            .filter_map(|owner| owner.domain())
            .any(|domain| self.contains(domain))
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }
}
