//! Remote entries and path-qualified entries
//!
//! A [`RemoteEntry`] is the provider-neutral view of a file, folder or
//! alias (shortcut) in the remote store. A [`PathEntry`] pairs an entry with
//! the ordered name segments leading to it from a fixed root.

use serde::{Deserialize, Serialize};

use super::newtypes::{join_path, RemoteId};

/// Kind tag of a remote entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A container whose children can be listed
    Folder,
    /// A shortcut pointing at another entry by identifier
    Alias,
    /// Anything else
    File,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Folder => write!(f, "folder"),
            EntryKind::Alias => write!(f, "alias"),
            EntryKind::File => write!(f, "file"),
        }
    }
}

/// Owner of a remote entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Owner's email address
    pub email: String,
    /// Owner's display name, when the store reports one
    pub display_name: Option<String>,
}

impl Owner {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
        }
    }

    /// Domain part of the email address (substring after the last `@`)
    ///
    /// An address without `@` has no domain.
    pub fn domain(&self) -> Option<&str> {
        self.email
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
    }
}

/// Provider-neutral view of an entry in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: RemoteId,
    pub name: String,
    pub kind: EntryKind,
    /// Raw MIME type reported by the store
    pub mime_type: Option<String>,
    pub owners: Vec<Owner>,
    /// Target identifier, set only for aliases
    pub alias_target: Option<RemoteId>,
}

impl RemoteEntry {
    /// Creates a folder entry with no owners
    pub fn folder(id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: EntryKind::Folder,
            mime_type: None,
            owners: Vec::new(),
            alias_target: None,
        }
    }

    /// Creates a plain file entry with the given owners
    pub fn file(id: RemoteId, name: impl Into<String>, owners: Vec<Owner>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: EntryKind::File,
            mime_type: None,
            owners,
            alias_target: None,
        }
    }

    /// Creates an alias entry pointing at `target`
    pub fn alias(id: RemoteId, name: impl Into<String>, target: RemoteId) -> Self {
        Self {
            id,
            name: name.into(),
            kind: EntryKind::Alias,
            mime_type: None,
            owners: Vec::new(),
            alias_target: Some(target),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    pub fn is_alias(&self) -> bool {
        self.kind == EntryKind::Alias
    }

    /// Identifier under which this entry's children live
    ///
    /// An alias is entered through its target; anything else is its own
    /// container.
    pub fn container_id(&self) -> &RemoteId {
        match (&self.alias_target, self.is_alias()) {
            (Some(target), true) => target,
            _ => &self.id,
        }
    }
}

/// A remote entry together with its path from a fixed root
///
/// Immutable once constructed. The path of a child is always its parent's
/// path with the child's name appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub path: Vec<String>,
    pub entry: RemoteEntry,
}

impl PathEntry {
    pub fn new(path: Vec<String>, entry: RemoteEntry) -> Self {
        Self { path, entry }
    }

    /// Builds an anchor from a known folder id and a path label
    ///
    /// The entry name is the last label segment (or empty for an unlabeled
    /// anchor); only the id is used for listing.
    pub fn anchor(id: RemoteId, path: Vec<String>) -> Self {
        let name = path.last().cloned().unwrap_or_default();
        Self {
            path,
            entry: RemoteEntry::folder(id, name),
        }
    }

    /// Returns the path entry of a child of this entry
    pub fn child(&self, name: &str, entry: RemoteEntry) -> Self {
        let mut path = self.path.clone();
        path.push(name.to_string());
        Self { path, entry }
    }

    /// Path rendered with `/` separators
    pub fn display_path(&self) -> String {
        join_path(&self.path)
    }

    pub fn id(&self) -> &RemoteId {
        &self.entry.id
    }
}
