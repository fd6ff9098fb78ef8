//! Sync command - mirror foreign-owned files into the destination
//!
//! Provides the `drivekeep sync` CLI command which:
//! 1. Loads and validates the configuration
//! 2. Authorizes against Drive, refreshing or logging in as needed
//! 3. Opens the source and destination folders
//! 4. Runs the mirror and prints the report

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::info;

use drivekeep_core::usecases::{AliasConflictPolicy, MirrorOptions, MirrorReport, MirrorUseCase};

use super::{connect, open_anchors, CliContext};
use crate::output::{format_duration, plural, OutputFormatter};

/// What to do when the destination holds an alias where a file belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictArg {
    Skip,
    Abort,
}

impl From<ConflictArg> for AliasConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Skip => AliasConflictPolicy::Skip,
            ConflictArg::Abort => AliasConflictPolicy::Abort,
        }
    }
}

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Show what would be copied without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Treat aliases in the source as plain entries instead of following them
    #[arg(long)]
    pub no_resolve_aliases: bool,

    /// Override `sync.on_alias_conflict`
    #[arg(long, value_enum)]
    pub on_alias_conflict: Option<ConflictArg>,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_validated_config()?;

        let mut options = MirrorOptions::new(config.allow_list()?)
            .dry_run(self.dry_run)
            .on_alias_conflict(
                self.on_alias_conflict
                    .map(AliasConflictPolicy::from)
                    .unwrap_or(config.sync.on_alias_conflict),
            );
        options.resolve_aliases = config.sync.resolve_aliases && !self.no_resolve_aliases;
        options.page_size = config.sync.page_size;
        options.include_trashed = config.sync.include_trashed;

        let store = connect(&config).await?;
        let (source, destination) = open_anchors(store.as_ref(), &config).await?;

        if self.dry_run {
            formatter.info("Dry run mode - no changes will be made");
        }
        formatter.info(&format!(
            "Mirroring {} into {}",
            source.display_path(),
            destination.display_path()
        ));
        info!(
            source = %config.source.id,
            destination = %config.destination.id,
            dry_run = self.dry_run,
            "Starting mirror"
        );

        let report = MirrorUseCase::new(store, options)
            .execute(&source, &destination)
            .await?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
        } else {
            print_report(&*formatter, &report);
        }
        Ok(())
    }
}

fn print_report(fmt: &dyn OutputFormatter, report: &MirrorReport) {
    let verb = if report.dry_run { "Would copy" } else { "Copied" };

    if report.files_copied == 0 && !report.has_issues() {
        fmt.success("Destination is up to date");
    } else {
        fmt.success(&format!(
            "Mirror completed in {}",
            format_duration(report.duration_ms)
        ));
    }

    for path in &report.copied {
        fmt.info(&format!("{}: {}", verb, path));
    }
    fmt.info(&format!(
        "Files seen:      {} ({} allow-listed, {} already present)",
        report.files_seen, report.files_allowed, report.files_present
    ));
    fmt.info(&format!(
        "{}:{}{} file{}",
        verb,
        " ".repeat(16 - verb.len()),
        report.files_copied,
        plural(report.files_copied)
    ));
    if report.folders_created > 0 {
        fmt.info(&format!(
            "Folders created: {}",
            report.folders_created
        ));
    }

    if report.has_issues() {
        fmt.warn(&format!(
            "{} issue{} recorded:",
            report.issues.len(),
            plural(report.issues.len())
        ));
        for issue in &report.issues {
            fmt.warn(&format!("  {}: {}", issue.path, issue.message));
        }
    }
}
