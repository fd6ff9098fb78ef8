//! Integration tests for drivekeep-drive
//!
//! Uses wiremock to simulate the Drive v3 API and verifies end-to-end
//! behavior of the DriveClient, the DriveStore adapter, retries and token
//! refresh.

mod common;

mod test_auth;
mod test_file_operations;
mod test_listing;
mod test_retry;
mod test_user_info;
