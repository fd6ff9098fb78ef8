//! Mirror use case
//!
//! Walks the source anchor and copies every file that no allow-listed domain
//! owns into the same relative location under the destination anchor,
//! creating intermediate folders as needed. Files already present at the
//! destination are left alone, so repeated runs converge.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::newtypes::join_path;
use crate::domain::{DomainAllowList, PathEntry};
use crate::ports::{IRemoteStore, StoreError, MAX_PAGE_SIZE};

use super::navigator::{NavigationError, NavigatorOptions, PathNavigator};
use super::walk_tree::{DereferenceFailure, TreeWalker, WalkError, WalkOptions};

/// What to do when the destination already holds an alias at a file's path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasConflictPolicy {
    /// Record an issue and move on
    #[default]
    Skip,
    /// Stop the run
    Abort,
}

/// Category of a non-fatal problem recorded during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    AliasDereference,
    CopyRejected,
    AliasAtDestination,
    DeleteRejected,
}

/// A non-fatal problem, reported in the run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorIssue {
    pub kind: IssueKind,
    pub path: String,
    pub message: String,
}

impl MirrorIssue {
    pub fn new(kind: IssueKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<DereferenceFailure> for MirrorIssue {
    fn from(failure: DereferenceFailure) -> Self {
        Self::new(
            IssueKind::AliasDereference,
            failure.display_path(),
            failure.reason,
        )
    }
}

/// Summary of a mirror run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MirrorReport {
    /// Leaves produced by the walk
    pub files_seen: usize,
    /// Leaves owned by an allow-listed domain, not copied
    pub files_allowed: usize,
    /// Leaves already present at the destination
    pub files_present: usize,
    /// Leaves copied (or, in dry-run, that would be copied)
    pub files_copied: usize,
    pub folders_created: usize,
    pub copied: Vec<String>,
    pub issues: Vec<MirrorIssue>,
    pub dry_run: bool,
    pub duration_ms: u64,
}

impl MirrorReport {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Fatal errors that end a mirror run
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("Failed to resolve '{path}' at destination: {source}")]
    Resolve {
        path: String,
        #[source]
        source: NavigationError,
    },

    #[error("Failed to create folder for '{path}': {source}")]
    EnsureFolder {
        path: String,
        #[source]
        source: NavigationError,
    },

    #[error("Failed to copy '{path}': {source}")]
    Copy {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Destination holds an alias at '{path}'")]
    AliasAtDestination { path: String },
}

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub allow_list: DomainAllowList,
    pub resolve_aliases: bool,
    pub dry_run: bool,
    pub on_alias_conflict: AliasConflictPolicy,
    pub page_size: u32,
    pub include_trashed: bool,
}

impl MirrorOptions {
    pub fn new(allow_list: DomainAllowList) -> Self {
        Self {
            allow_list,
            resolve_aliases: true,
            dry_run: false,
            on_alias_conflict: AliasConflictPolicy::default(),
            page_size: MAX_PAGE_SIZE,
            include_trashed: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn on_alias_conflict(mut self, policy: AliasConflictPolicy) -> Self {
        self.on_alias_conflict = policy;
        self
    }
}

/// Outcome of processing one leaf
#[derive(Debug)]
enum LeafOutcome {
    Allowed,
    Present,
    Copied,
    Issue(MirrorIssue),
}

pub struct MirrorUseCase {
    store: Arc<dyn IRemoteStore>,
    navigator: PathNavigator,
    options: MirrorOptions,
}

impl MirrorUseCase {
    pub fn new(store: Arc<dyn IRemoteStore>, options: MirrorOptions) -> Self {
        let navigator = PathNavigator::with_options(
            Arc::clone(&store),
            NavigatorOptions {
                page_size: options.page_size,
                include_trashed: options.include_trashed,
            },
        );
        Self {
            store,
            navigator,
            options,
        }
    }

    /// Mirrors every non-allow-listed file below `source` into `destination`
    ///
    /// Each leaf's full path, including the source anchor's own path, is
    /// recreated below `destination`.
    ///
    /// # Errors
    /// Returns the first fatal error. Issues recorded before it are logged
    /// but not returned.
    pub async fn execute(
        &mut self,
        source: &PathEntry,
        destination: &PathEntry,
    ) -> Result<MirrorReport, MirrorError> {
        let started = Instant::now();
        let mut report = MirrorReport {
            dry_run: self.options.dry_run,
            ..MirrorReport::default()
        };
        let created_before = self.navigator.folders_created();

        info!(
            source = %source.display_path(),
            destination = %destination.display_path(),
            dry_run = self.options.dry_run,
            "Starting mirror"
        );

        let mut walker = TreeWalker::new(
            Arc::clone(&self.store),
            source.clone(),
            WalkOptions {
                resolve_aliases: self.options.resolve_aliases,
                page_size: self.options.page_size,
                include_trashed: self.options.include_trashed,
            },
        );

        while let Some(leaf) = walker.next_leaf().await? {
            report.files_seen += 1;
            report
                .issues
                .extend(walker.take_failures().into_iter().map(MirrorIssue::from));

            match self.process_leaf(&leaf, destination).await? {
                LeafOutcome::Allowed => report.files_allowed += 1,
                LeafOutcome::Present => report.files_present += 1,
                LeafOutcome::Copied => {
                    report.files_copied += 1;
                    report.copied.push(leaf.display_path());
                }
                LeafOutcome::Issue(issue) => report.issues.push(issue),
            }
        }
        report
            .issues
            .extend(walker.take_failures().into_iter().map(MirrorIssue::from));

        report.folders_created = self.navigator.folders_created() - created_before;
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            seen = report.files_seen,
            allowed = report.files_allowed,
            present = report.files_present,
            copied = report.files_copied,
            folders_created = report.folders_created,
            issues = report.issues.len(),
            duration_ms = report.duration_ms,
            "Mirror complete"
        );

        Ok(report)
    }

    async fn process_leaf(
        &mut self,
        leaf: &PathEntry,
        destination: &PathEntry,
    ) -> Result<LeafOutcome, MirrorError> {
        let path = leaf.display_path();

        if self.options.allow_list.is_allowed(&leaf.entry) {
            debug!(path = %path, "Owned by allowed domain, skipping");
            return Ok(LeafOutcome::Allowed);
        }

        let Some((name, parents)) = leaf.path.split_last() else {
            return Err(MirrorError::Resolve {
                path,
                source: NavigationError::EmptyPath,
            });
        };

        match self.navigator.resolve(&leaf.path, destination).await {
            Ok(found) if found.entry.is_alias() => {
                return match self.options.on_alias_conflict {
                    AliasConflictPolicy::Skip => {
                        warn!(path = %path, "Destination holds an alias, skipping");
                        Ok(LeafOutcome::Issue(MirrorIssue::new(
                            IssueKind::AliasAtDestination,
                            path,
                            format!("alias {} found where a file was expected", found.entry.id),
                        )))
                    }
                    AliasConflictPolicy::Abort => Err(MirrorError::AliasAtDestination { path }),
                };
            }
            Ok(_) => {
                debug!(path = %path, "Already mirrored");
                return Ok(LeafOutcome::Present);
            }
            Err(err) if err.is_not_found() => {}
            Err(source) => return Err(MirrorError::Resolve { path, source }),
        }

        if self.options.dry_run {
            info!(path = %path, "Would copy");
            return Ok(LeafOutcome::Copied);
        }

        let folder = self
            .navigator
            .ensure_folder(parents, destination)
            .await
            .map_err(|source| MirrorError::EnsureFolder {
                path: join_path(parents),
                source,
            })?;

        match self
            .store
            .copy_file(&leaf.entry.id, folder.entry.container_id(), name)
            .await
        {
            Ok(copy) => {
                info!(path = %path, id = %copy.id, "Copied file");
                Ok(LeafOutcome::Copied)
            }
            Err(err) if err.is_rejection() => {
                warn!(path = %path, error = %err, "Copy rejected, skipping");
                Ok(LeafOutcome::Issue(MirrorIssue::new(
                    IssueKind::CopyRejected,
                    path,
                    err.to_string(),
                )))
            }
            Err(source) => Err(MirrorError::Copy { path, source }),
        }
    }
}
