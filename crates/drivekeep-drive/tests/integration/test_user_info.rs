//! Integration test for the Drive `about` endpoint

use drivekeep_core::ports::IRemoteStore;
use drivekeep_drive::provider::DriveStore;

use crate::common;

#[tokio::test]
async fn test_get_user_info_returns_profile() {
    let (_server, client) = common::setup_drive_mock().await;

    let user_info = client.get_user_info().await.expect("get_user_info failed");

    assert_eq!(user_info.email, "mirror@hb.edu");
    assert_eq!(user_info.display_name, "Mirror Account");
}

#[tokio::test]
async fn test_store_get_user_info() {
    let (_server, client) = common::setup_drive_mock().await;
    let store = DriveStore::new(client);

    let user_info = store.get_user_info().await.expect("get_user_info failed");

    assert_eq!(user_info.email, "mirror@hb.edu");
}
