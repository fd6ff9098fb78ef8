//! Memoization of resolved paths for the duration of one run

use std::collections::HashMap;

use crate::domain::{PathEntry, RemoteId};

/// Cache key: the anchor's identity, the full path from the root and the
/// listing filter the path was resolved under
///
/// The full path is the anchor's own path followed by the requested
/// segments, so two lookups only share a key when they name the same place
/// under the same anchor. A filtered lookup may legitimately miss an entry
/// an unfiltered one finds, so the extra clauses are part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    anchor: RemoteId,
    path: Vec<String>,
    clauses: Vec<String>,
}

impl CacheKey {
    pub fn new(start: &PathEntry, segments: &[String]) -> Self {
        Self::filtered(start, segments, &[])
    }

    pub fn filtered(start: &PathEntry, segments: &[String], clauses: &[String]) -> Self {
        let mut path = Vec::with_capacity(start.path.len() + segments.len());
        path.extend_from_slice(&start.path);
        path.extend_from_slice(segments);
        Self {
            anchor: start.id().clone(),
            path,
            clauses: clauses.to_vec(),
        }
    }
}

/// Grow-only map from [`CacheKey`] to resolved [`PathEntry`]
///
/// Never evicted and never persisted; a fresh cache is built per run.
#[derive(Debug, Default)]
pub struct PathCache {
    entries: HashMap<CacheKey, PathEntry>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&PathEntry> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: CacheKey, entry: PathEntry) {
        self.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
