//! Breadth-first traversal of a remote subtree
//!
//! [`TreeWalker`] is a lazy, forward-only cursor over the non-folder leaves
//! below a start folder. Folders are queued in a FIFO frontier and expanded
//! one page of children at a time; leaves come out in breadth-first order
//! across levels and in page (name) order within a folder.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::newtypes::join_path;
use crate::domain::{PathEntry, RemoteEntry, RemoteId};
use crate::ports::{IRemoteStore, ListQuery, StoreError, MAX_PAGE_SIZE};

/// Fatal failures that end a walk
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Failed to list children of '{path}': {source}")]
    List {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to dereference alias '{path}': {source}")]
    Dereference {
        path: String,
        #[source]
        source: StoreError,
    },
}

/// An alias that could not be followed; the alias is skipped
#[derive(Debug, Clone)]
pub struct DereferenceFailure {
    pub path: Vec<String>,
    pub alias: RemoteId,
    pub target: Option<RemoteId>,
    pub reason: String,
}

impl DereferenceFailure {
    pub fn display_path(&self) -> String {
        join_path(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Replace aliases by their targets before classifying them
    pub resolve_aliases: bool,
    pub page_size: u32,
    pub include_trashed: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            resolve_aliases: true,
            page_size: MAX_PAGE_SIZE,
            include_trashed: false,
        }
    }
}

/// Pagination state for the folder being expanded
#[derive(Debug)]
enum Cursor {
    Start,
    Next(String),
    Exhausted,
}

pub struct TreeWalker {
    store: Arc<dyn IRemoteStore>,
    options: WalkOptions,
    /// Folder whose children are being listed
    current: Option<PathEntry>,
    cursor: Cursor,
    /// Children of the last fetched page not yet classified
    buffer: VecDeque<RemoteEntry>,
    frontier: VecDeque<PathEntry>,
    visited: HashSet<RemoteId>,
    failures: Vec<DereferenceFailure>,
    pages_fetched: usize,
}

impl TreeWalker {
    pub fn new(store: Arc<dyn IRemoteStore>, start: PathEntry, options: WalkOptions) -> Self {
        let mut visited = HashSet::new();
        visited.insert(start.entry.container_id().clone());
        Self {
            store,
            options,
            current: Some(start),
            cursor: Cursor::Start,
            buffer: VecDeque::new(),
            frontier: VecDeque::new(),
            visited,
            failures: Vec::new(),
            pages_fetched: 0,
        }
    }

    /// Returns the next leaf, or `None` once the subtree is exhausted
    ///
    /// Leaves are never folders. With alias resolution enabled they are
    /// never aliases either, unless an alias points at another alias.
    ///
    /// # Errors
    /// A failed listing, or a failed alias lookup that is not a rejection,
    /// ends the walk.
    pub async fn next_leaf(&mut self) -> Result<Option<PathEntry>, WalkError> {
        loop {
            if let Some(child) = self.buffer.pop_front() {
                if let Some(leaf) = self.classify(child).await? {
                    return Ok(Some(leaf));
                }
                continue;
            }

            if self.current.is_none() {
                return Ok(None);
            }

            let page_token = match std::mem::replace(&mut self.cursor, Cursor::Exhausted) {
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
                Cursor::Exhausted => {
                    self.current = self.frontier.pop_front();
                    self.cursor = Cursor::Start;
                    continue;
                }
            };

            let Some(parent) = self.current.as_ref() else {
                return Ok(None);
            };
            let query = ListQuery::children_of(parent.entry.container_id().clone())
                .with_page_size(self.options.page_size)
                .with_trashed(self.options.include_trashed);

            let page = self
                .store
                .list_children(&query, page_token.as_deref())
                .await
                .map_err(|source| WalkError::List {
                    path: parent.display_path(),
                    source,
                })?;
            self.pages_fetched += 1;

            debug!(
                folder = %parent.display_path(),
                entries = page.entries.len(),
                more = page.next_page_token.is_some(),
                "Fetched page"
            );

            self.buffer.extend(page.entries);
            self.cursor = match page.next_page_token {
                Some(token) => Cursor::Next(token),
                None => Cursor::Exhausted,
            };
        }
    }

    /// Dereference failures recorded since the last call
    pub fn take_failures(&mut self) -> Vec<DereferenceFailure> {
        std::mem::take(&mut self.failures)
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Drains the walk, returning every leaf and every dereference failure
    pub async fn collect_leaves(
        mut self,
    ) -> Result<(Vec<PathEntry>, Vec<DereferenceFailure>), WalkError> {
        let mut leaves = Vec::new();
        while let Some(leaf) = self.next_leaf().await? {
            leaves.push(leaf);
        }
        Ok((leaves, self.take_failures()))
    }

    /// Queues folders and returns leaves
    async fn classify(&mut self, child: RemoteEntry) -> Result<Option<PathEntry>, WalkError> {
        let mut path = self
            .current
            .as_ref()
            .map(|p| p.path.clone())
            .unwrap_or_default();
        path.push(child.name.clone());

        let resolved = if self.options.resolve_aliases && child.is_alias() {
            match self.dereference(&path, &child).await? {
                Some(target) => target,
                None => return Ok(None),
            }
        } else {
            child
        };

        if resolved.is_folder() {
            if self.visited.insert(resolved.id.clone()) {
                self.frontier.push_back(PathEntry::new(path, resolved));
            } else {
                debug!(path = %join_path(&path), "Folder already visited, skipping");
            }
            return Ok(None);
        }

        Ok(Some(PathEntry::new(path, resolved)))
    }

    /// Fetches the target of an alias
    ///
    /// Returns `None` after recording a failure that should not end the walk.
    async fn dereference(
        &mut self,
        path: &[String],
        alias: &RemoteEntry,
    ) -> Result<Option<RemoteEntry>, WalkError> {
        let Some(target) = alias.alias_target.clone() else {
            warn!(path = %join_path(path), "Alias without target, skipping");
            self.failures.push(DereferenceFailure {
                path: path.to_vec(),
                alias: alias.id.clone(),
                target: None,
                reason: "alias has no target".to_string(),
            });
            return Ok(None);
        };

        match self.store.get_entry(&target).await {
            Ok(entry) => {
                debug!(path = %join_path(path), target = %target, kind = %entry.kind, "Dereferenced alias");
                Ok(Some(entry))
            }
            Err(err) if err.is_rejection() => {
                warn!(path = %join_path(path), target = %target, error = %err, "Alias target rejected, skipping");
                self.failures.push(DereferenceFailure {
                    path: path.to_vec(),
                    alias: alias.id.clone(),
                    target: Some(target),
                    reason: err.to_string(),
                });
                Ok(None)
            }
            Err(source) => Err(WalkError::Dereference {
                path: join_path(path),
                source,
            }),
        }
    }
}
