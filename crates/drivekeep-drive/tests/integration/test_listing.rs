//! Integration tests for child listings, pagination and path resolution
//! through the DriveStore adapter

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use drivekeep_core::domain::{EntryKind, PathEntry, RemoteId};
use drivekeep_core::ports::{IRemoteStore, KindConstraint, ListQuery};
use drivekeep_core::usecases::{PathNavigator, TreeWalker, WalkOptions};
use drivekeep_drive::client::FILE_LIST_FIELDS;
use drivekeep_drive::provider::DriveStore;

use crate::common;

const ROOT_Q: &str = "'root1' in parents and trashed = false";

fn root() -> RemoteId {
    RemoteId::new("root1").unwrap()
}

#[tokio::test]
async fn test_list_files_sends_query_and_auth() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", ROOT_Q))
        .and(query_param("pageSize", "1000"))
        .and(query_param("orderBy", "name"))
        .and(query_param("fields", FILE_LIST_FIELDS))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [common::file_json("f1", "a.pdf", "application/pdf", "x@other.org")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = client
        .list_files(ROOT_Q, 1000, None)
        .await
        .expect("list_files failed");

    assert_eq!(list.files.len(), 1);
    assert_eq!(list.files[0].name, "a.pdf");
    assert!(list.next_page_token.is_none());
}

#[tokio::test]
async fn test_store_lists_and_classifies_children() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_list_page(
        &server,
        ROOT_Q,
        None,
        json!([
            common::folder_json("d1", "A"),
            common::shortcut_json("s1", "link", "t1"),
            common::file_json("f1", "doc", "application/pdf", "x@other.org"),
        ]),
        Some("next-token"),
    )
    .await;

    let store = DriveStore::new(client);
    let page = store
        .list_children(&ListQuery::children_of(root()), None)
        .await
        .expect("list_children failed");

    let kinds: Vec<EntryKind> = page.entries.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EntryKind::Folder, EntryKind::Alias, EntryKind::File]);
    assert_eq!(page.entries[1].alias_target.as_ref().unwrap().as_str(), "t1");
    assert_eq!(page.entries[2].owners[0].email, "x@other.org");
    assert_eq!(page.next_page_token.as_deref(), Some("next-token"));
}

#[tokio::test]
async fn test_folder_like_query_is_rendered() {
    let (server, client) = common::setup_drive_mock().await;
    let q = "(mimeType = 'application/vnd.google-apps.folder' or \
             mimeType = 'application/vnd.google-apps.shortcut') and \
             'root1' in parents and trashed = false";
    common::mount_list_page(&server, q, None, json!([common::folder_json("d1", "A")]), None)
        .await;

    let store = DriveStore::new(client);
    let query = ListQuery::children_of(root()).with_kind(KindConstraint::FolderLike);
    let page = store.list_children(&query, None).await.unwrap();

    assert_eq!(page.entries.len(), 1);
}

#[tokio::test]
async fn test_resolution_walks_every_page() {
    let (server, client) = common::setup_drive_mock().await;
    let filler = |start: usize| {
        json!((start..start + 3)
            .map(|i| common::file_json(&format!("f{i}"), &format!("file{i:02}"), "text/plain", "x@o.org"))
            .collect::<Vec<_>>())
    };
    common::mount_list_page(&server, ROOT_Q, None, filler(0), Some("p2")).await;
    common::mount_list_page(&server, ROOT_Q, Some("p2"), filler(3), Some("p3")).await;
    common::mount_list_page(
        &server,
        ROOT_Q,
        Some("p3"),
        json!([common::file_json("target", "wanted", "text/plain", "x@o.org")]),
        None,
    )
    .await;

    let store = Arc::new(DriveStore::new(client));
    let mut navigator = PathNavigator::new(store);
    let start = PathEntry::anchor(root(), vec!["Robotics".to_string()]);

    let found = navigator
        .resolve(&["wanted".to_string()], &start)
        .await
        .expect("resolve failed");

    assert_eq!(found.entry.id.as_str(), "target");
    assert_eq!(found.display_path(), "Robotics/wanted");
    let requests = server.received_requests().await.unwrap();
    let list_calls = requests.iter().filter(|r| r.url.path() == "/files").count();
    assert_eq!(list_calls, 3);
}

#[tokio::test]
async fn test_walker_dereferences_shortcuts() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_list_page(
        &server,
        ROOT_Q,
        None,
        json!([common::shortcut_json("s1", "link", "t1")]),
        None,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json(
            "t1",
            "real.pdf",
            "application/pdf",
            "owner@other.org",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(DriveStore::new(client));
    let start = PathEntry::anchor(root(), vec!["Robotics".to_string()]);
    let walker = TreeWalker::new(store, start, WalkOptions::default());
    let (leaves, failures) = walker.collect_leaves().await.expect("walk failed");

    assert!(failures.is_empty());
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].display_path(), "Robotics/link");
    assert_eq!(leaves[0].entry.id.as_str(), "t1");
    assert_eq!(leaves[0].entry.owners[0].email, "owner@other.org");
}

#[tokio::test]
async fn test_walker_records_rejected_shortcut() {
    let (server, client) = common::setup_drive_mock().await;
    common::mount_list_page(
        &server,
        ROOT_Q,
        None,
        json!([common::shortcut_json("s1", "broken", "gone")]),
        None,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/gone"))
        .respond_with(ResponseTemplate::new(400).set_body_json(common::error_json(
            400,
            "invalid",
            "Invalid Value",
        )))
        .mount(&server)
        .await;

    let store = Arc::new(DriveStore::new(client));
    let start = PathEntry::anchor(root(), vec!["Robotics".to_string()]);
    let (leaves, failures) = TreeWalker::new(store, start, WalkOptions::default())
        .collect_leaves()
        .await
        .expect("walk failed");

    assert!(leaves.is_empty());
    assert_eq!(failures.len(), 1);
    assert!(failures[0].reason.contains("Invalid Value"));
}
