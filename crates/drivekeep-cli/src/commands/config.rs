//! Config command - View and manage DriveKeep configuration
//!
//! Provides the `drivekeep config` CLI command which:
//! 1. Writes a starter configuration file (`init`)
//! 2. Shows the current configuration (YAML or JSON)
//! 3. Sets individual configuration values via dot-notation keys
//! 4. Validates the configuration file and reports every error

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use drivekeep_core::config::{Config, LogFormat, TokenStoreKind};
use drivekeep_core::usecases::AliasConflictPolicy;

use super::CliContext;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a configuration file
    Init {
        /// Drive id of the source folder
        #[arg(long)]
        source_id: String,
        /// Path label of the source folder, recreated under the destination
        #[arg(long, default_value = "")]
        source_path: String,
        /// Drive id of the destination folder
        #[arg(long)]
        destination_id: String,
        /// Path label of the destination folder
        #[arg(long, default_value = "")]
        destination_path: String,
        /// Owner domain whose files are never copied (repeatable)
        #[arg(long = "allow-domain", required = true)]
        allowed_domains: Vec<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.page_size")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Init {
                source_id,
                source_path,
                destination_id,
                destination_path,
                allowed_domains,
                force,
            } => {
                let mut config = Config::default();
                config.source.id = source_id.clone();
                config.source.path = source_path.clone();
                config.destination.id = destination_id.clone();
                config.destination.path = destination_path.clone();
                config.ownership.allowed_domains = allowed_domains.clone();
                execute_init(ctx, &config, *force)
            }
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Set { key, value } => execute_set(ctx, key, value),
            ConfigCommand::Validate => execute_validate(ctx),
        }
    }
}

fn execute_init(ctx: &CliContext, config: &Config, force: bool) -> Result<()> {
    let fmt = ctx.formatter();
    let path = &ctx.config_path;

    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        );
    }

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        bail!("Refusing to write invalid configuration:\n  {}", details.join("\n  "));
    }

    config.save(path)?;
    info!(config_path = %path.display(), "Wrote configuration");

    fmt.success(&format!("Configuration written to {}", path.display()));
    fmt.info(&format!(
        "Place your OAuth client secrets at {}",
        config.auth.client_secrets.display()
    ));
    fmt.info("Then run 'drivekeep auth login'");
    Ok(())
}

fn execute_show(ctx: &CliContext) -> Result<()> {
    let fmt = ctx.formatter();
    let config = ctx.load_config()?;

    if ctx.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        fmt.print_json(&json);
    } else {
        fmt.success(&format!("Configuration ({})", ctx.config_path.display()));
        fmt.info("");
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            fmt.info(line);
        }
    }
    Ok(())
}

fn execute_set(ctx: &CliContext, key: &str, value: &str) -> Result<()> {
    let fmt = ctx.formatter();
    let mut config = ctx.load_config()?;

    apply_config_value(&mut config, key, value)
        .with_context(|| format!("Failed to set '{}'", key))?;

    // only reject errors caused by this key; a partially filled file is fine
    let errors: Vec<String> = config
        .validate()
        .iter()
        .filter(|e| e.field == key)
        .map(|e| e.message.clone())
        .collect();
    if !errors.is_empty() {
        bail!("Invalid value for '{}': {}", key, errors.join("; "));
    }

    config.save(&ctx.config_path)?;
    info!(key = %key, value = %value, "Configuration value set");

    if ctx.is_json() {
        fmt.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": ctx.config_path.display().to_string(),
        }));
    } else {
        fmt.success(&format!("Set {} = {}", key, value));
    }
    Ok(())
}

fn execute_validate(ctx: &CliContext) -> Result<()> {
    let fmt = ctx.formatter();
    let path = &ctx.config_path;

    if !path.exists() {
        bail!(
            "Configuration file not found at {}. Run 'drivekeep config init' first.",
            path.display()
        );
    }
    let config = Config::load(path)?;
    let errors = config.validate();

    if ctx.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        fmt.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        fmt.success("Configuration is valid");
        fmt.info(&format!("File: {}", path.display()));
    } else {
        fmt.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            crate::output::plural(errors.len())
        ));
        fmt.info(&format!("File: {}", path.display()));
        for error in &errors {
            fmt.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if !errors.is_empty() {
        bail!("Configuration is invalid");
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("Expected true or false, got '{}'", value),
    }
}

/// Apply a dot-notation key/value pair to a Config struct
///
/// `ownership.allowed_domains` takes a comma-separated list.
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "source.id" => config.source.id = value.to_string(),
        "source.path" => config.source.path = value.to_string(),
        "destination.id" => config.destination.id = value.to_string(),
        "destination.path" => config.destination.path = value.to_string(),

        "ownership.allowed_domains" => {
            config.ownership.allowed_domains = value
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }

        "sync.resolve_aliases" => config.sync.resolve_aliases = parse_bool(value)?,
        "sync.include_trashed" => config.sync.include_trashed = parse_bool(value)?,
        "sync.page_size" => {
            config.sync.page_size = value
                .parse::<u32>()
                .context("Expected a positive integer for sync.page_size")?;
        }
        "sync.on_alias_conflict" => {
            config.sync.on_alias_conflict = match value {
                "skip" => AliasConflictPolicy::Skip,
                "abort" => AliasConflictPolicy::Abort,
                _ => bail!("Expected skip or abort, got '{}'", value),
            };
        }

        "drive.base_url" => config.drive.base_url = value.to_string(),
        "drive.max_retries" => {
            config.drive.max_retries = value
                .parse::<u32>()
                .context("Expected a positive integer for drive.max_retries")?;
        }
        "drive.retry_base_delay_ms" => {
            config.drive.retry_base_delay_ms = value
                .parse::<u64>()
                .context("Expected a positive integer for drive.retry_base_delay_ms")?;
        }

        "auth.client_secrets" => config.auth.client_secrets = value.into(),
        "auth.token_file" => config.auth.token_file = value.into(),
        "auth.token_store" => {
            config.auth.token_store = match value {
                "file" => TokenStoreKind::File,
                "keyring" => TokenStoreKind::Keyring,
                _ => bail!("Expected file or keyring, got '{}'", value),
            };
        }
        "auth.redirect_port" => {
            config.auth.redirect_port = value
                .parse::<u16>()
                .context("Expected a port number for auth.redirect_port")?;
        }

        "logging.level" => config.logging.level = value.to_string(),
        "logging.format" => {
            config.logging.format = match value {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => bail!("Expected pretty or json, got '{}'", value),
            };
        }

        _ => bail!("Unknown configuration key '{}'", key),
    }
    Ok(())
}
