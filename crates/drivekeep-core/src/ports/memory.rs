//! In-memory [`IRemoteStore`] used by the use case tests
//!
//! Models a tree of entries with parent links, name-ordered pagination via
//! offset tokens, registered listing clauses, injectable failures and
//! per-operation call counters.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::domain::{Owner, RemoteEntry, RemoteId};

use super::remote_store::{IRemoteStore, ListPage, ListQuery, StoreError, UserInfo};

/// Number of calls made per store operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub get: usize,
    pub create: usize,
    pub copy: usize,
    pub delete: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list + self.get + self.create + self.copy + self.delete
    }
}

#[derive(Debug)]
struct Node {
    entry: RemoteEntry,
    parent: Option<RemoteId>,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<RemoteId, Node>,
    next_id: u64,
    calls: CallCounts,
    get_failures: HashMap<RemoteId, StoreError>,
    copy_failures: HashMap<RemoteId, StoreError>,
    clause_filters: HashMap<String, fn(&RemoteEntry) -> bool>,
}

impl State {
    fn allocate_id(&mut self) -> RemoteId {
        self.next_id += 1;
        RemoteId::new(format!("n{:04}", self.next_id)).unwrap()
    }

    fn insert(&mut self, parent: Option<RemoteId>, entry: RemoteEntry) -> RemoteId {
        let id = entry.id.clone();
        self.nodes.insert(id.clone(), Node { entry, parent });
        id
    }
}

pub struct MemoryStore {
    state: Mutex<State>,
    /// Owner recorded on copies and newly created folders
    copier: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            copier: "mirror@hb.edu".to_string(),
        }
    }

    /// Adds a parentless folder with a fixed id
    pub fn add_root(&self, id: &str, name: &str) -> RemoteId {
        let id = RemoteId::new(id).unwrap();
        let mut state = self.state.lock().unwrap();
        state.insert(None, RemoteEntry::folder(id, name))
    }

    pub fn add_folder(&self, parent: &RemoteId, name: &str) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id();
        state.insert(Some(parent.clone()), RemoteEntry::folder(id, name))
    }

    pub fn add_file(&self, parent: &RemoteId, name: &str, owners: &[&str]) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id();
        let owners = owners.iter().map(|e| Owner::new(*e)).collect();
        state.insert(Some(parent.clone()), RemoteEntry::file(id, name, owners))
    }

    pub fn add_alias(&self, parent: &RemoteId, name: &str, target: &RemoteId) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id();
        state.insert(
            Some(parent.clone()),
            RemoteEntry::alias(id, name, target.clone()),
        )
    }

    /// Makes every `get_entry(id)` fail with `error`
    pub fn fail_get(&self, id: &RemoteId, error: StoreError) {
        self.state
            .lock()
            .unwrap()
            .get_failures
            .insert(id.clone(), error);
    }

    /// Makes every copy of `id` fail with `error`
    pub fn fail_copy(&self, id: &RemoteId, error: StoreError) {
        self.state
            .lock()
            .unwrap()
            .copy_failures
            .insert(id.clone(), error);
    }

    /// Teaches the store an extra listing clause
    ///
    /// Listings carrying `clause` keep only the children `admits` accepts.
    /// Listings carrying a clause that was never registered are rejected.
    pub fn register_clause(&self, clause: &str, admits: fn(&RemoteEntry) -> bool) {
        self.state
            .lock()
            .unwrap()
            .clause_filters
            .insert(clause.to_string(), admits);
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls
    }

    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls = CallCounts::default();
    }

    /// Direct children of `parent` named `name`, without counting a call
    pub fn children_named(&self, parent: &RemoteId, name: &str) -> Vec<RemoteEntry> {
        let state = self.state.lock().unwrap();
        state
            .nodes
            .values()
            .filter(|n| n.parent.as_ref() == Some(parent) && n.entry.name == name)
            .map(|n| n.entry.clone())
            .collect()
    }

    pub fn contains(&self, id: &RemoteId) -> bool {
        self.state.lock().unwrap().nodes.contains_key(id)
    }
}

#[async_trait::async_trait]
impl IRemoteStore for MemoryStore {
    async fn list_children(
        &self,
        query: &ListQuery,
        page_token: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.list += 1;

        let mut filters = Vec::with_capacity(query.extra_clauses.len());
        for clause in &query.extra_clauses {
            match state.clause_filters.get(clause) {
                Some(admits) => filters.push(*admits),
                None => return Err(StoreError::BadRequest(format!("unknown clause {clause}"))),
            }
        }

        let mut children: Vec<&RemoteEntry> = state
            .nodes
            .values()
            .filter(|n| n.parent.as_ref() == Some(&query.parent))
            .map(|n| &n.entry)
            .filter(|e| query.kind.admits(e))
            .filter(|e| filters.iter().all(|admits| admits(e)))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::BadRequest(format!("bad page token {token}")))?,
            None => 0,
        };
        let page_size = query.page_size as usize;
        let end = (offset + page_size).min(children.len());
        let entries = children
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|e| (*e).clone())
            .collect();
        let next_page_token = (end < children.len()).then(|| end.to_string());

        Ok(ListPage {
            entries,
            next_page_token,
        })
    }

    async fn get_entry(&self, id: &RemoteId) -> Result<RemoteEntry, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.get += 1;
        if let Some(err) = state.get_failures.get(id) {
            return Err(err.clone());
        }
        state
            .nodes
            .get(id)
            .map(|n| n.entry.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create_folder(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteEntry, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create += 1;
        if !state.nodes.contains_key(parent) {
            return Err(StoreError::NotFound(parent.to_string()));
        }
        let id = state.allocate_id();
        let mut entry = RemoteEntry::folder(id, name);
        entry.owners = vec![Owner::new(self.copier.clone())];
        state.insert(Some(parent.clone()), entry.clone());
        Ok(entry)
    }

    async fn copy_file(
        &self,
        file: &RemoteId,
        dest_parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteEntry, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.copy += 1;
        if let Some(err) = state.copy_failures.get(file) {
            return Err(err.clone());
        }
        let source = state
            .nodes
            .get(file)
            .map(|n| n.entry.clone())
            .ok_or_else(|| StoreError::NotFound(file.to_string()))?;
        if !state.nodes.contains_key(dest_parent) {
            return Err(StoreError::NotFound(dest_parent.to_string()));
        }
        let id = state.allocate_id();
        let mut copy = RemoteEntry::file(id, name, vec![Owner::new(self.copier.clone())]);
        copy.mime_type = source.mime_type;
        state.insert(Some(dest_parent.clone()), copy.clone());
        Ok(copy)
    }

    async fn delete_entry(&self, id: &RemoteId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete += 1;
        state
            .nodes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn get_user_info(&self) -> Result<UserInfo, StoreError> {
        Ok(UserInfo {
            email: self.copier.clone(),
            display_name: "Mirror".to_string(),
        })
    }
}
