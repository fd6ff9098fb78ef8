//! DriveStore - IRemoteStore implementation for Google Drive
//!
//! Wraps the [`DriveClient`] and converts Drive file resources into
//! provider-neutral [`RemoteEntry`] values.
//!
//! ## Design Notes
//!
//! - Uses `tokio::sync::Mutex` because `IRemoteStore` methods take `&self`
//!   while updating the access token requires `&mut DriveClient`.
//! - Authentication is handled separately by `DriveAuthAdapter`; this store
//!   expects a client that already carries a valid token.

use tokio::sync::Mutex;
use tracing::debug;

use drivekeep_core::domain::{EntryKind, Owner, RemoteEntry, RemoteId};
use drivekeep_core::ports::{IRemoteStore, ListPage, ListQuery, StoreError, UserInfo};

use crate::client::{DriveClient, DriveFile};
use crate::query::{self, FOLDER_MIME_TYPE, SHORTCUT_MIME_TYPE};
use crate::DriveError;

/// Converts a Drive file resource into a [`RemoteEntry`]
fn file_to_entry(file: DriveFile) -> Result<RemoteEntry, DriveError> {
    let id = RemoteId::new(file.id.clone())
        .map_err(|e| DriveError::InvalidResponse(format!("file id: {e}")))?;

    let kind = match file.mime_type.as_deref() {
        Some(FOLDER_MIME_TYPE) => EntryKind::Folder,
        Some(SHORTCUT_MIME_TYPE) => EntryKind::Alias,
        _ => EntryKind::File,
    };

    let alias_target = match (kind, file.shortcut_details) {
        (EntryKind::Alias, Some(details)) => details
            .target_id
            .map(RemoteId::new)
            .transpose()
            .map_err(|e| DriveError::InvalidResponse(format!("shortcut target: {e}")))?,
        _ => None,
    };

    let owners = file
        .owners
        .into_iter()
        .filter_map(|user| {
            user.email_address.map(|email| Owner {
                email,
                display_name: user.display_name,
            })
        })
        .collect();

    Ok(RemoteEntry {
        id,
        name: file.name,
        kind,
        mime_type: file.mime_type,
        owners,
        alias_target,
    })
}

/// Remote store backed by the Drive v3 API
pub struct DriveStore {
    client: Mutex<DriveClient>,
}

impl DriveStore {
    pub fn new(client: DriveClient) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }

    /// Replaces the bearer token used for subsequent requests
    pub async fn set_access_token(&self, token: impl Into<String>) {
        self.client.lock().await.set_access_token(token);
    }
}

#[async_trait::async_trait]
impl IRemoteStore for DriveStore {
    async fn list_children(
        &self,
        query: &ListQuery,
        page_token: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let q = query::render(query);
        let client = self.client.lock().await;
        debug!(parent = %query.parent, "DriveStore::list_children");

        let list = client.list_files(&q, query.page_size, page_token).await?;
        let entries = list
            .files
            .into_iter()
            .map(file_to_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListPage {
            entries,
            next_page_token: list.next_page_token,
        })
    }

    async fn get_entry(&self, id: &RemoteId) -> Result<RemoteEntry, StoreError> {
        let client = self.client.lock().await;
        debug!(id = %id, "DriveStore::get_entry");
        let file = client.get_file(id.as_str()).await?;
        Ok(file_to_entry(file)?)
    }

    async fn create_folder(
        &self,
        parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteEntry, StoreError> {
        let client = self.client.lock().await;
        debug!(parent = %parent, name, "DriveStore::create_folder");
        let file = client.create_folder(parent.as_str(), name).await?;
        Ok(file_to_entry(file)?)
    }

    async fn copy_file(
        &self,
        file: &RemoteId,
        dest_parent: &RemoteId,
        name: &str,
    ) -> Result<RemoteEntry, StoreError> {
        let client = self.client.lock().await;
        debug!(file = %file, parent = %dest_parent, name, "DriveStore::copy_file");
        let copy = client
            .copy_file(file.as_str(), dest_parent.as_str(), name)
            .await?;
        Ok(file_to_entry(copy)?)
    }

    async fn delete_entry(&self, id: &RemoteId) -> Result<(), StoreError> {
        let client = self.client.lock().await;
        debug!(id = %id, "DriveStore::delete_entry");
        client.delete_file(id.as_str()).await?;
        Ok(())
    }

    async fn get_user_info(&self) -> Result<UserInfo, StoreError> {
        let client = self.client.lock().await;
        debug!("DriveStore::get_user_info");
        Ok(client.get_user_info().await?)
    }
}
