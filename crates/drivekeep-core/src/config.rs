//! Configuration module for DriveKeep.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::split_path;
use crate::domain::{DomainAllowList, DomainError, RemoteId};
use crate::ports::MAX_PAGE_SIZE;
use crate::usecases::AliasConflictPolicy;

/// Default Drive v3 endpoint.
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Top-level configuration for DriveKeep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder whose foreign-owned files are mirrored.
    pub source: AnchorConfig,
    /// Folder under which the mirror is built.
    pub destination: AnchorConfig,
    pub ownership: OwnershipConfig,
    pub sync: SyncConfig,
    pub drive: DriveConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// A fixed starting folder: its Drive id and the path label it stands for.
///
/// `path` is a `/`-separated label. The source label is recreated under the
/// destination, so `path: Robotics` mirrors into `<destination>/Robotics`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub id: String,
    pub path: String,
}

impl AnchorConfig {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    pub fn remote_id(&self) -> Result<RemoteId, DomainError> {
        RemoteId::new(self.id.clone())
    }

    pub fn segments(&self) -> Vec<String> {
        split_path(&self.path)
    }
}

/// Which files count as "ours".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipConfig {
    /// Owner email domains whose files are never copied.
    pub allowed_domains: Vec<String>,
}

/// Traversal and copy behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Follow aliases (shortcuts) while walking the source.
    pub resolve_aliases: bool,
    /// Entries requested per listing page (1-1000).
    pub page_size: u32,
    /// Also list entries in the trash.
    pub include_trashed: bool,
    /// `skip` or `abort` when the destination holds an alias where a file belongs.
    pub on_alias_conflict: AliasConflictPolicy,
}

/// Drive API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub base_url: String,
    /// Retries after the first attempt for throttled or failed requests.
    pub max_retries: u32,
    /// Initial backoff delay, doubled on each retry.
    pub retry_base_delay_ms: u64,
}

/// Where tokens are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    #[default]
    File,
    Keyring,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Google OAuth client secrets (`credentials.json`, installed-app format).
    pub client_secrets: PathBuf,
    pub token_store: TokenStoreKind,
    /// Token file used when `token_store` is `file`.
    pub token_file: PathBuf,
    /// Loopback port for the OAuth redirect. `0` picks a free port.
    pub redirect_port: u16,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivekeep/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }

    /// The allow-list built from `ownership.allowed_domains`.
    pub fn allow_list(&self) -> Result<DomainAllowList, DomainError> {
        DomainAllowList::new(&self.ownership.allowed_domains)
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("drivekeep")
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            resolve_aliases: true,
            page_size: MAX_PAGE_SIZE,
            include_trashed: false,
            on_alias_conflict: AliasConflictPolicy::Skip,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DRIVE_BASE_URL.to_string(),
            max_retries: 5,
            retry_base_delay_ms: 1000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let dir = config_dir();
        Self {
            client_secrets: dir.join("credentials.json"),
            token_store: TokenStoreKind::File,
            token_file: dir.join("token.json"),
            redirect_port: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"source.id"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- anchors ---
        for (field, anchor) in [("source", &self.source), ("destination", &self.destination)] {
            if anchor.id.is_empty() {
                errors.push(ValidationError::new(&format!("{field}.id"), "must be set"));
            } else if let Err(e) = anchor.remote_id() {
                errors.push(ValidationError::new(&format!("{field}.id"), e.to_string()));
            }
        }
        if !self.source.id.is_empty() && self.source.id == self.destination.id {
            errors.push(ValidationError::new(
                "destination.id",
                "must differ from source.id",
            ));
        }

        // --- ownership ---
        if self.ownership.allowed_domains.is_empty() {
            errors.push(ValidationError::new(
                "ownership.allowed_domains",
                "at least one domain is required",
            ));
        } else if let Err(e) = self.allow_list() {
            errors.push(ValidationError::new(
                "ownership.allowed_domains",
                e.to_string(),
            ));
        }

        // --- sync ---
        if self.sync.page_size == 0 || self.sync.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError::new(
                "sync.page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        // --- drive ---
        if !(self.drive.base_url.starts_with("https://")
            || self.drive.base_url.starts_with("http://"))
        {
            errors.push(ValidationError::new(
                "drive.base_url",
                "must be an http(s) URL",
            ));
        }
        if self.drive.retry_base_delay_ms == 0 && self.drive.max_retries > 0 {
            errors.push(ValidationError::new(
                "drive.retry_base_delay_ms",
                "must be greater than 0 when retries are enabled",
            ));
        }

        // --- auth ---
        if self.auth.token_store == TokenStoreKind::File
            && self.auth.token_file.as_os_str().is_empty()
        {
            errors.push(ValidationError::new(
                "auth.token_file",
                "must be set when token_store is file",
            ));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        errors
    }
}

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and overrides individual fields.
///
/// ```
/// use drivekeep_core::config::ConfigBuilder;
///
/// let cfg = ConfigBuilder::new()
///     .source("src-folder", "Robotics")
///     .destination("dst-folder", "moved to HB")
///     .allowed_domain("hb.edu")
///     .build();
/// assert_eq!(cfg.source.path, "Robotics");
/// ```
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pre-populated with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn source(mut self, id: impl Into<String>, path: impl Into<String>) -> Self {
        self.config.source = AnchorConfig::new(id, path);
        self
    }

    pub fn destination(mut self, id: impl Into<String>, path: impl Into<String>) -> Self {
        self.config.destination = AnchorConfig::new(id, path);
        self
    }

    pub fn allowed_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.ownership.allowed_domains.push(domain.into());
        self
    }

    pub fn resolve_aliases(mut self, resolve: bool) -> Self {
        self.config.sync.resolve_aliases = resolve;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.sync.page_size = page_size;
        self
    }

    pub fn on_alias_conflict(mut self, policy: AliasConflictPolicy) -> Self {
        self.config.sync.on_alias_conflict = policy;
        self
    }

    pub fn drive_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.base_url = url.into();
        self
    }

    pub fn drive_max_retries(mut self, n: u32) -> Self {
        self.config.drive.max_retries = n;
        self
    }

    pub fn token_store(mut self, kind: TokenStoreKind) -> Self {
        self.config.auth.token_store = kind;
        self
    }

    pub fn token_file(mut self, path: PathBuf) -> Self {
        self.config.auth.token_file = path;
        self
    }

    pub fn client_secrets(mut self, path: PathBuf) -> Self {
        self.config.auth.client_secrets = path;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
