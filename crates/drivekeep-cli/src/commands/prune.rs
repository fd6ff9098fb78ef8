//! Prune-aliases command - remove aliases from the mirror
//!
//! Deletes every alias found below `<destination>/<source path>`. Earlier
//! mirror runs that did not follow aliases may have copied them verbatim.

use anyhow::Result;
use clap::Args;
use tracing::info;

use drivekeep_core::usecases::{PruneAliasesUseCase, PruneOptions, PruneReport};

use super::{connect, open_anchors, CliContext};
use crate::output::{format_duration, OutputFormatter};

#[derive(Debug, Args)]
pub struct PruneAliasesCommand {
    /// List the aliases that would be deleted without deleting them
    #[arg(long)]
    pub dry_run: bool,
}

impl PruneAliasesCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_validated_config()?;

        let store = connect(&config).await?;
        let (source, destination) = open_anchors(store.as_ref(), &config).await?;

        if self.dry_run {
            formatter.info("Dry run mode - no changes will be made");
        }
        info!(dry_run = self.dry_run, "Pruning aliases");

        let options = PruneOptions {
            dry_run: self.dry_run,
            page_size: config.sync.page_size,
            include_trashed: config.sync.include_trashed,
        };
        let report = PruneAliasesUseCase::new(store, options)
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

fn print_report(fmt: &dyn OutputFormatter, report: &PruneReport) {
    if report.aliases_found == 0 {
        fmt.success(&format!("No aliases below {}", report.mirror_root));
        return;
    }

    let verb = if report.dry_run { "Would delete" } else { "Deleted" };
    for path in &report.deleted {
        fmt.info(&format!("{}: {}", verb, path));
    }
    fmt.success(&format!(
        "{} {} of {} alias{} below {} in {}",
        verb,
        report.aliases_deleted,
        report.aliases_found,
        if report.aliases_found == 1 { "" } else { "es" },
        report.mirror_root,
        format_duration(report.duration_ms)
    ));

    if !report.issues.is_empty() {
        fmt.warn(&format!(
            "{} alias{} could not be deleted:",
            report.issues.len(),
            if report.issues.len() == 1 { "" } else { "es" }
        ));
        for issue in &report.issues {
            fmt.warn(&format!("  {}: {}", issue.path, issue.message));
        }
    }
}
