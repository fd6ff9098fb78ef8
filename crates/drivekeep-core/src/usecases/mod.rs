//! Use cases (interactors) for DriveKeep
//!
//! This module contains the application use cases that orchestrate
//! domain entities and the remote store port.
//!
//! ## Use Cases
//!
//! - [`PathNavigator`] - Memoized path resolution and folder creation
//! - [`TreeWalker`] - Breadth-first traversal yielding non-folder leaves
//! - [`MirrorUseCase`] - Copy files not owned by an allowed domain
//! - [`PruneAliasesUseCase`] - Remove aliases from a mirrored tree

pub mod mirror;
pub mod navigator;
pub mod path_cache;
pub mod prune_aliases;
pub mod walk_tree;

pub use mirror::{
    AliasConflictPolicy, IssueKind, MirrorError, MirrorIssue, MirrorOptions, MirrorReport,
    MirrorUseCase,
};
pub use navigator::{open_anchor, NavigationError, NavigatorOptions, PathNavigator};
pub use path_cache::{CacheKey, PathCache};
pub use prune_aliases::{PruneAliasesUseCase, PruneError, PruneOptions, PruneReport};
pub use walk_tree::{DereferenceFailure, TreeWalker, WalkError, WalkOptions};
