//! Alias pruning use case
//!
//! Removes every alias found below the mirror root, the folder under the
//! destination that corresponds to the source anchor. Aliases are never
//! followed, so only entries inside the mirror itself are deleted.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::PathEntry;
use crate::ports::{IRemoteStore, StoreError, MAX_PAGE_SIZE};

use super::mirror::{IssueKind, MirrorIssue};
use super::navigator::{NavigationError, NavigatorOptions, PathNavigator};
use super::walk_tree::{TreeWalker, WalkError, WalkOptions};

/// Summary of a prune run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    pub mirror_root: String,
    pub aliases_found: usize,
    /// Aliases deleted (or, in dry-run, that would be deleted)
    pub aliases_deleted: usize,
    pub deleted: Vec<String>,
    pub issues: Vec<MirrorIssue>,
    pub dry_run: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Error)]
pub enum PruneError {
    #[error("Mirror root '{path}' not found: {source}")]
    MirrorRoot {
        path: String,
        #[source]
        source: NavigationError,
    },

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("Failed to delete alias '{path}': {source}")]
    Delete {
        path: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone)]
pub struct PruneOptions {
    pub dry_run: bool,
    pub page_size: u32,
    pub include_trashed: bool,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            page_size: MAX_PAGE_SIZE,
            include_trashed: false,
        }
    }
}

pub struct PruneAliasesUseCase {
    store: Arc<dyn IRemoteStore>,
    options: PruneOptions,
}

impl PruneAliasesUseCase {
    pub fn new(store: Arc<dyn IRemoteStore>, options: PruneOptions) -> Self {
        Self { store, options }
    }

    /// Deletes the aliases below `destination` + `source.path`
    ///
    /// # Errors
    /// Fails if the mirror root does not exist, the walk fails, or a delete
    /// fails with anything other than a rejection.
    pub async fn execute(
        &self,
        source: &PathEntry,
        destination: &PathEntry,
    ) -> Result<PruneReport, PruneError> {
        let started = Instant::now();

        let mirror_root = if source.path.is_empty() {
            destination.clone()
        } else {
            let mut navigator = PathNavigator::with_options(
                Arc::clone(&self.store),
                NavigatorOptions {
                    page_size: self.options.page_size,
                    include_trashed: self.options.include_trashed,
                },
            );
            navigator
                .resolve(&source.path, destination)
                .await
                .map_err(|source_err| PruneError::MirrorRoot {
                    path: source.display_path(),
                    source: source_err,
                })?
        };

        let mut report = PruneReport {
            mirror_root: mirror_root.display_path(),
            dry_run: self.options.dry_run,
            ..PruneReport::default()
        };
        info!(root = %report.mirror_root, dry_run = report.dry_run, "Pruning aliases");

        let mut walker = TreeWalker::new(
            Arc::clone(&self.store),
            mirror_root,
            WalkOptions {
                resolve_aliases: false,
                page_size: self.options.page_size,
                include_trashed: self.options.include_trashed,
            },
        );

        while let Some(leaf) = walker.next_leaf().await? {
            if !leaf.entry.is_alias() {
                continue;
            }
            report.aliases_found += 1;
            let path = leaf.display_path();

            if self.options.dry_run {
                info!(path = %path, "Would delete alias");
                report.aliases_deleted += 1;
                report.deleted.push(path);
                continue;
            }

            match self.store.delete_entry(&leaf.entry.id).await {
                Ok(()) => {
                    info!(path = %path, id = %leaf.entry.id, "Deleted alias");
                    report.aliases_deleted += 1;
                    report.deleted.push(path);
                }
                Err(err) if err.is_rejection() => {
                    warn!(path = %path, error = %err, "Delete rejected, skipping");
                    report
                        .issues
                        .push(MirrorIssue::new(IssueKind::DeleteRejected, path, err.to_string()));
                }
                Err(source) => return Err(PruneError::Delete { path, source }),
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            found = report.aliases_found,
            deleted = report.aliases_deleted,
            issues = report.issues.len(),
            "Prune complete"
        );
        Ok(report)
    }
}
