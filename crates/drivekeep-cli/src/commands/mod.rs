//! CLI subcommands and the wiring they share
//!
//! Every command receives a [`CliContext`] carrying the global flags. Commands
//! that talk to Drive go through [`connect`] and [`open_anchors`] so token
//! handling and client settings live in one place.

pub mod auth;
pub mod completions;
pub mod config;
pub mod prune;
pub mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use drivekeep_core::config::{Config, TokenStoreKind};
use drivekeep_core::domain::PathEntry;
use drivekeep_core::ports::IRemoteStore;
use drivekeep_core::usecases::open_anchor;
use drivekeep_drive::auth::{ClientSecrets, DriveAuthAdapter, OAuth2Config, TokenStorage};
use drivekeep_drive::client::{DriveClient, RetryPolicy};
use drivekeep_drive::provider::DriveStore;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Keyring account name for stored tokens
const KEYRING_USER: &str = "default";

/// Global flags resolved once in `main`
#[derive(Debug, Clone)]
pub struct CliContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config_path: PathBuf,
}

impl CliContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Loads the config file, or defaults when there is none yet
    pub fn load_config(&self) -> Result<Config> {
        if self.config_path.exists() {
            Config::load(&self.config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Loads the config file and rejects it if any field is invalid
    pub fn load_validated_config(&self) -> Result<Config> {
        load_validated_config(&self.config_path)
    }
}

pub fn load_validated_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        bail!(
            "Configuration file not found at {}. Run 'drivekeep config init' first.",
            path.display()
        );
    }
    let config = Config::load(path)?;
    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        bail!(
            "Invalid configuration in {}:\n  {}",
            path.display(),
            details.join("\n  ")
        );
    }
    Ok(config)
}

/// Where tokens live according to `auth.token_store`
pub fn token_storage(config: &Config) -> TokenStorage {
    match config.auth.token_store {
        TokenStoreKind::File => TokenStorage::File(config.auth.token_file.clone()),
        TokenStoreKind::Keyring => TokenStorage::Keyring {
            username: KEYRING_USER.to_string(),
        },
    }
}

/// Builds the OAuth adapter from the configured client secrets
pub fn auth_adapter(config: &Config) -> Result<DriveAuthAdapter> {
    let secrets = ClientSecrets::from_file(&config.auth.client_secrets)?;
    Ok(
        DriveAuthAdapter::new(OAuth2Config::from_secrets(&secrets), token_storage(config))
            .with_redirect_port(config.auth.redirect_port),
    )
}

pub fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy {
        max_retries: config.drive.max_retries,
        base_delay: Duration::from_millis(config.drive.retry_base_delay_ms),
        ..RetryPolicy::default()
    }
}

/// Acquires valid tokens and returns a store bound to them
pub async fn connect(config: &Config) -> Result<Arc<DriveStore>> {
    let tokens = auth_adapter(config)?
        .authorize()
        .await
        .context("Authorization failed")?;

    let client = DriveClient::with_base_url(tokens.access_token, config.drive.base_url.clone())
        .with_retry_policy(retry_policy(config));
    let store = Arc::new(DriveStore::new(client));

    let user = store
        .get_user_info()
        .await
        .context("Failed to retrieve the signed-in account")?;
    info!(email = %user.email, "Connected to Drive");

    Ok(store)
}

/// Opens the configured source and destination folders
pub async fn open_anchors(
    store: &dyn IRemoteStore,
    config: &Config,
) -> Result<(PathEntry, PathEntry)> {
    let source = open_anchor(store, &config.source.remote_id()?, config.source.segments())
        .await
        .with_context(|| format!("Cannot open source folder {}", config.source.id))?;
    let destination = open_anchor(
        store,
        &config.destination.remote_id()?,
        config.destination.segments(),
    )
    .await
    .with_context(|| format!("Cannot open destination folder {}", config.destination.id))?;
    Ok((source, destination))
}
