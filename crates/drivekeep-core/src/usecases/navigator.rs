//! Path resolution and folder ensuring
//!
//! [`PathNavigator`] turns name segments into remote entries by listing one
//! folder at a time, and creates missing folders on request (`mkdir -p`).
//! Every resolved prefix is memoized in a [`PathCache`] owned by the
//! navigator, so one navigator should live for exactly one run.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::newtypes::join_path;
use crate::domain::{PathEntry, RemoteEntry, RemoteId};
use crate::ports::{IRemoteStore, KindConstraint, ListQuery, StoreError, MAX_PAGE_SIZE};

use super::path_cache::{CacheKey, PathCache};

/// Errors returned by path resolution
#[derive(Debug, Error)]
pub enum NavigationError {
    /// No segments were given
    #[error("Path is empty")]
    EmptyPath,

    /// A segment could not be found after exhausting every page
    ///
    /// `remaining` starts with the segment that was not found.
    #[error("Not found: {}", join_path(remaining))]
    NotFound { remaining: Vec<String> },

    /// An anchor exists but is not a folder
    #[error("Entry {id} is a {kind}, expected a folder")]
    NotAFolder { id: RemoteId, kind: String },

    /// The remote store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NavigationError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, NavigationError::NotFound { .. })
    }
}

/// Listing parameters shared by every lookup of a navigator
#[derive(Debug, Clone)]
pub struct NavigatorOptions {
    pub page_size: u32,
    pub include_trashed: bool,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            include_trashed: false,
        }
    }
}

/// Resolves and creates paths below anchor entries
pub struct PathNavigator {
    store: Arc<dyn IRemoteStore>,
    cache: PathCache,
    options: NavigatorOptions,
    folders_created: usize,
}

impl PathNavigator {
    pub fn new(store: Arc<dyn IRemoteStore>) -> Self {
        Self::with_options(store, NavigatorOptions::default())
    }

    pub fn with_options(store: Arc<dyn IRemoteStore>, options: NavigatorOptions) -> Self {
        Self {
            store,
            cache: PathCache::new(),
            options,
            folders_created: 0,
        }
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    /// Number of folders created by [`ensure_folder`](Self::ensure_folder)
    pub fn folders_created(&self) -> usize {
        self.folders_created
    }

    /// Resolves `segments` below `start`
    ///
    /// See [`resolve_filtered`](Self::resolve_filtered).
    pub async fn resolve(
        &mut self,
        segments: &[String],
        start: &PathEntry,
    ) -> Result<PathEntry, NavigationError> {
        self.resolve_filtered(segments, start, &[]).await
    }

    /// Resolves `segments` below `start`, ANDing `extra_clauses` into every listing
    ///
    /// Intermediate segments only match folders and aliases; an alias is
    /// entered through its target. The last segment matches any kind and is
    /// returned exactly as listed, so an alias at the end stays an alias.
    ///
    /// # Errors
    /// [`NavigationError::NotFound`] carrying the unresolved segments when a
    /// segment has no match on any page.
    pub async fn resolve_filtered(
        &mut self,
        segments: &[String],
        start: &PathEntry,
        extra_clauses: &[String],
    ) -> Result<PathEntry, NavigationError> {
        let Some((_, parents)) = segments.split_last() else {
            return Err(NavigationError::EmptyPath);
        };

        if let Some(hit) = self
            .cache
            .get(&CacheKey::filtered(start, segments, extra_clauses))
        {
            debug!(path = %hit.display_path(), "Path cache hit");
            return Ok(hit.clone());
        }

        let (resolved, mut current) = self.longest_cached_prefix(start, parents, extra_clauses);

        for (idx, segment) in segments.iter().enumerate().skip(resolved) {
            let kind = if idx + 1 < segments.len() {
                KindConstraint::FolderLike
            } else {
                KindConstraint::Any
            };

            let parent_id = current.entry.container_id().clone();
            match self
                .find_child(&parent_id, segment, kind, extra_clauses)
                .await?
            {
                Some(found) => {
                    current = current.child(segment, found);
                    self.cache.put(
                        CacheKey::filtered(start, &segments[..=idx], extra_clauses),
                        current.clone(),
                    );
                }
                None => {
                    debug!(
                        parent = %current.display_path(),
                        segment = %segment,
                        "Path segment not found"
                    );
                    return Err(NavigationError::NotFound {
                        remaining: segments[idx..].to_vec(),
                    });
                }
            }
        }

        Ok(current)
    }

    /// Ensures every segment exists as a folder below `start` (`mkdir -p`)
    ///
    /// Existing folders are reused; missing ones are created. Once a folder
    /// has been created its subtree is known to be empty, so deeper
    /// segments are created without listing. An empty segment list returns
    /// `start` itself.
    ///
    /// A prefix already resolved through an alias is reused as is, so the
    /// returned entry may be that alias; new children belong under its
    /// [`RemoteEntry::container_id`].
    pub async fn ensure_folder(
        &mut self,
        segments: &[String],
        start: &PathEntry,
    ) -> Result<PathEntry, NavigationError> {
        if segments.is_empty() {
            return Ok(start.clone());
        }

        let (resolved, mut current) = self.longest_cached_prefix(start, segments, &[]);
        if resolved == segments.len() {
            debug!(path = %current.display_path(), "Folder cache hit");
            return Ok(current);
        }

        let mut creating = false;
        for (idx, segment) in segments.iter().enumerate().skip(resolved) {
            let parent_id = current.entry.container_id().clone();

            let existing = if creating {
                None
            } else {
                self.find_child(&parent_id, segment, KindConstraint::FolderOnly, &[])
                    .await?
            };

            let folder = match existing {
                Some(folder) => folder,
                None => {
                    creating = true;
                    let created = self.store.create_folder(&parent_id, segment).await?;
                    self.folders_created += 1;
                    info!(
                        parent = %current.display_path(),
                        name = %segment,
                        id = %created.id,
                        "Created folder"
                    );
                    created
                }
            };

            current = current.child(segment, folder);
            self.cache
                .put(CacheKey::new(start, &segments[..=idx]), current.clone());
        }

        Ok(current)
    }

    /// Returns the longest folder-like prefix of `segments` cached under
    /// the same listing filter
    ///
    /// Yields the number of segments already resolved and the entry they
    /// resolve to (`start` when nothing is cached). A cached alias prefix is
    /// entered through [`RemoteEntry::container_id`] by the callers.
    fn longest_cached_prefix(
        &self,
        start: &PathEntry,
        segments: &[String],
        extra_clauses: &[String],
    ) -> (usize, PathEntry) {
        for len in (1..=segments.len()).rev() {
            let key = CacheKey::filtered(start, &segments[..len], extra_clauses);
            if let Some(hit) = self.cache.get(&key) {
                if KindConstraint::FolderLike.admits(&hit.entry) {
                    return (len, hit.clone());
                }
            }
        }
        (0, start.clone())
    }

    /// Scans the children of `parent` page by page for an exact name match
    async fn find_child(
        &self,
        parent: &RemoteId,
        name: &str,
        kind: KindConstraint,
        extra_clauses: &[String],
    ) -> Result<Option<RemoteEntry>, StoreError> {
        let query = ListQuery::children_of(parent.clone())
            .with_kind(kind)
            .with_extra_clauses(extra_clauses)
            .with_page_size(self.options.page_size)
            .with_trashed(self.options.include_trashed);

        let mut page_token: Option<String> = None;
        let mut pages = 0usize;
        loop {
            let page = self
                .store
                .list_children(&query, page_token.as_deref())
                .await?;
            pages += 1;

            if let Some(found) = page.entries.into_iter().find(|e| e.name == name) {
                debug!(parent = %parent, name, pages, id = %found.id, "Found child");
                return Ok(Some(found));
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => {
                    debug!(parent = %parent, name, pages, "Child not found");
                    return Ok(None);
                }
            }
        }
    }
}

/// Loads an anchor folder by id, entering it through its target if it is an alias
///
/// # Errors
/// [`NavigationError::NotAFolder`] when the entry (or alias target) is not
/// a folder.
pub async fn open_anchor(
    store: &dyn IRemoteStore,
    id: &RemoteId,
    path: Vec<String>,
) -> Result<PathEntry, NavigationError> {
    let mut entry = store.get_entry(id).await?;
    if let (true, Some(target)) = (entry.is_alias(), entry.alias_target.clone()) {
        entry = store.get_entry(&target).await?;
    }
    if !entry.is_folder() {
        return Err(NavigationError::NotAFolder {
            id: entry.id,
            kind: entry.kind.to_string(),
        });
    }
    Ok(PathEntry::new(path, entry))
}
