//! DriveKeep CLI - keep copies of foreign-owned Drive files
//!
//! Provides commands for:
//! - Authentication with Google Drive
//! - Mirroring files owned outside the allow-listed domains
//! - Removing aliases from the mirror
//! - Managing the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    auth::AuthCommand, completions::CompletionsCommand, config::ConfigCommand,
    prune::PruneAliasesCommand, sync::SyncCommand, CliContext,
};
use drivekeep_core::config::{Config, LogFormat};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "drivekeep",
    version,
    about = "Copy Google Drive files owned outside your domain into a folder you own"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Copy foreign-owned files from the source into the destination
    Sync(SyncCommand),
    /// Delete aliases found in the mirror
    PruneAliases(PruneAliasesCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Picks the log filter: `-v` flags win, then `RUST_LOG`, then `logging.level`
fn log_filter(verbose: u8, configured: &str) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

fn init_tracing(verbose: u8, quiet: bool, config: &Config) {
    let level = if quiet { "warn" } else { config.logging.level.as_str() };
    let filter = log_filter(verbose, level);

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    init_tracing(cli.verbose, cli.quiet, &Config::load_or_default(&config_path));

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CliContext {
        format,
        quiet: cli.quiet,
        config_path,
    };

    if let Err(e) = run(cli.command, &ctx).await {
        get_formatter(format, cli.quiet).error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(command: Commands, ctx: &CliContext) -> Result<()> {
    match command {
        Commands::Auth(cmd) => cmd.execute(ctx).await,
        Commands::Sync(cmd) => cmd.execute(ctx).await,
        Commands::PruneAliases(cmd) => cmd.execute(ctx).await,
        Commands::Config(cmd) => cmd.execute(ctx).await,
        Commands::Completions(cmd) => cmd.execute(),
    }
}
