use super::{read_document, read_json, write_json};
use crate::config::Config;
use anyhow::{Context, Result};
use canvas_editor::{apply_patches, invert_patches, BatchPolicy, Patch};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PatchArgs {
    /// Document to patch
    pub document: PathBuf,

    /// JSON array of patches
    pub patches: PathBuf,

    /// Write the patched document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip failed `test` ops instead of aborting (overrides config)
    #[arg(long)]
    pub skip_failed_tests: bool,

    /// Also write the patches that undo this batch
    #[arg(long)]
    pub inverse: Option<PathBuf>,
}

pub fn patch(args: PatchArgs, config: &Config) -> Result<()> {
    let doc = read_document(&args.document)?;
    let patches: Vec<Patch> = read_json(&args.patches)?;

    let policy = if args.skip_failed_tests {
        BatchPolicy::SkipFailedTests
    } else {
        config.batch_policy
    };

    let outcome = apply_patches(&doc, &patches, policy)
        .with_context(|| format!("Cannot apply {}", args.patches.display()))?;

    for index in &outcome.skipped {
        eprintln!(
            "  {} skipped failed test #{} at {}",
            "⚠️".yellow(),
            index,
            patches[*index].path
        );
    }

    if let Some(path) = &args.inverse {
        let inverse = invert_patches(&outcome.recorded).context("Cannot invert the applied patches")?;
        write_json(&inverse, Some(path))?;
    }

    write_json(&outcome.document, args.output.as_deref())?;

    eprintln!(
        "{} Applied {} of {} patches",
        "✅".green(),
        outcome.recorded.len(),
        patches.len()
    );

    Ok(())
}
