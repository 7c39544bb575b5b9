use super::{read_document, write_json};
use crate::config::Config;
use anyhow::{anyhow, Result};
use canvas_merge::{merge_documents, MergeOutcome};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Common ancestor
    pub base: PathBuf,

    pub local: PathBuf,

    pub remote: PathBuf,

    /// Write the merged document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write conflicts, resolutions and rejected steps as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Fail when anything needs review or was rejected
    #[arg(long)]
    pub strict: bool,
}

pub fn merge(args: MergeArgs, config: &Config) -> Result<()> {
    let base = read_document(&args.base)?;
    let local = read_document(&args.local)?;
    let remote = read_document(&args.remote)?;

    let outcome = merge_documents(&base, &local, &remote, &config.merge_config())?;

    print_summary(&outcome);

    if let Some(path) = &args.report {
        let report = serde_json::json!({
            "conflicts": outcome.conflicts,
            "resolutions": outcome.resolutions,
            "rejected": outcome.rejected,
        });
        write_json(&report, Some(path))?;
    }

    write_json(&outcome.document, args.output.as_deref())?;

    if args.strict && !outcome.is_clean() {
        return Err(anyhow!(
            "{} conflicts need review, {} steps rejected",
            outcome.review_queue().len(),
            outcome.rejected.len()
        ));
    }

    Ok(())
}

fn print_summary(outcome: &MergeOutcome) {
    for resolution in &outcome.resolutions {
        let conflict = &resolution.conflict;
        if resolution.requires_review {
            eprintln!(
                "  {} {} {} - {}",
                "?".yellow().bold(),
                conflict.conflict_type,
                conflict.id,
                resolution.explanation
            );
        } else if resolution.applied {
            eprintln!(
                "  {} {} {} ({}, {:.2})",
                "✓".green(),
                conflict.conflict_type,
                conflict.id,
                resolution.strategy,
                resolution.confidence
            );
        }
    }

    for step in &outcome.rejected {
        eprintln!("  {} {} - {}", "✗".red(), step.description, step.reason.red());
    }

    eprintln!();
    if outcome.is_clean() {
        eprintln!(
            "{} Merged with {} conflicts, all resolved",
            "✅".green(),
            outcome.conflicts.len()
        );
    } else {
        eprintln!(
            "{} Merged with {} conflicts: {} need review, {} steps rejected",
            "⚠️".yellow(),
            outcome.conflicts.len(),
            outcome.review_queue().len(),
            outcome.rejected.len()
        );
    }
}
