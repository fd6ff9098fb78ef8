//! Auth commands - Login, Logout, and Status for Google Drive authentication
//!
//! Provides the `drivekeep auth` CLI subcommands which:
//! 1. `login`  - Runs the OAuth2 PKCE flow, stores tokens in the configured
//!    token store and shows the signed-in account.
//! 2. `logout` - Removes stored tokens.
//! 3. `status` - Shows where tokens are stored and whether they are valid.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use tracing::info;

use drivekeep_core::ports::{IRemoteStore, Tokens};
use drivekeep_drive::client::DriveClient;
use drivekeep_drive::provider::DriveStore;

use super::{auth_adapter, retry_policy, token_storage, CliContext};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authenticate with Google Drive via OAuth2
    Login,
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            AuthCommand::Login => execute_login(ctx).await,
            AuthCommand::Logout => execute_logout(ctx),
            AuthCommand::Status => execute_status(ctx),
        }
    }
}

/// Runs the browser login, stores the tokens and fetches the account
async fn execute_login(ctx: &CliContext) -> Result<()> {
    let fmt = ctx.formatter();
    let config = ctx.load_config()?;
    let adapter = auth_adapter(&config)?;

    fmt.info("Opening browser for Google login...");
    let tokens = adapter.login().await.context("OAuth2 login failed")?;
    adapter
        .storage()
        .store(&tokens)
        .context("Failed to store tokens")?;

    let client = DriveClient::with_base_url(tokens.access_token, config.drive.base_url.clone())
        .with_retry_policy(retry_policy(&config));
    let user = DriveStore::new(client)
        .get_user_info()
        .await
        .context("Failed to retrieve user info from Drive")?;
    info!(email = %user.email, "Logged in");

    if ctx.is_json() {
        fmt.print_json(&serde_json::json!({
            "authenticated": true,
            "email": user.email,
            "display_name": user.display_name,
            "token_store": adapter.storage().describe(),
        }));
    } else {
        fmt.success(&format!(
            "Authenticated as {} ({})",
            user.display_name, user.email
        ));
        fmt.info(&format!("Tokens stored in {}", adapter.storage().describe()));
    }
    Ok(())
}

fn execute_logout(ctx: &CliContext) -> Result<()> {
    let fmt = ctx.formatter();
    let config = ctx.load_config()?;
    let storage = token_storage(&config);

    storage.clear().context("Failed to remove stored tokens")?;

    fmt.success("Logged out successfully");
    fmt.info(&format!("Credentials removed from {}", storage.describe()));
    Ok(())
}

fn token_status(tokens: &Tokens) -> &'static str {
    match (tokens.is_expired(), tokens.refresh_token.is_some()) {
        (false, _) => "Valid",
        (true, true) => "Expired (will refresh)",
        (true, false) => "Expired",
    }
}

fn execute_status(ctx: &CliContext) -> Result<()> {
    let fmt = ctx.formatter();
    let config = ctx.load_config()?;
    let storage = token_storage(&config);

    let tokens = storage.load().context("Failed to read stored tokens")?;

    if ctx.is_json() {
        let json = match &tokens {
            Some(t) => serde_json::json!({
                "authenticated": true,
                "token_store": storage.describe(),
                "token_status": token_status(t),
                "expires_at": t.expires_at.to_rfc3339(),
                "has_refresh_token": t.refresh_token.is_some(),
            }),
            None => serde_json::json!({
                "authenticated": false,
                "token_store": storage.describe(),
            }),
        };
        fmt.print_json(&json);
        return Ok(());
    }

    match tokens {
        Some(t) => {
            fmt.success(&format!("Token status: {}", token_status(&t)));
            fmt.info(&format!("Token store:  {}", storage.describe()));
            let remaining = t.expires_at - Utc::now();
            if remaining.num_seconds() > 0 {
                fmt.info(&format!(
                    "Expires in:   {} min ({})",
                    remaining.num_minutes(),
                    t.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
        }
        None => {
            fmt.info("Authentication status: Not logged in");
            fmt.info("Run 'drivekeep auth login' to authenticate");
        }
    }
    Ok(())
}
