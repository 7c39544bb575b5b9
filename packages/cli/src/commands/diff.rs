use super::{read_document, write_json};
use crate::config::Config;
use anyhow::{Context, Result};
use canvas_merge::{diff_documents_checked, forward_patches, ChangeType, DiffOperation};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiffFormat {
    /// One colored line per operation
    Text,
    /// Diff operations as JSON
    Json,
    /// Patches that turn BASE into OTHER
    Patches,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    pub base: PathBuf,

    pub other: PathBuf,

    #[arg(short, long, value_enum, default_value = "text")]
    pub format: DiffFormat,

    /// Write JSON output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn diff(args: DiffArgs, config: &Config) -> Result<()> {
    let base = read_document(&args.base)?;
    let other = read_document(&args.other)?;

    let ops = diff_documents_checked(&base, &other, &config.merge_config())?;

    match args.format {
        DiffFormat::Json => write_json(&ops, args.output.as_deref()),
        DiffFormat::Patches => {
            let patches = forward_patches(&base, &other).context("Cannot turn the diff into patches")?;
            write_json(&patches, args.output.as_deref())
        }
        DiffFormat::Text => {
            if ops.is_empty() {
                println!("{}", "No differences".dimmed());
            }
            for op in &ops {
                println!("{}", format_op(op));
            }
            Ok(())
        }
    }
}

fn format_op(op: &DiffOperation) -> String {
    let marker = match op.change {
        ChangeType::Added => "+".green(),
        ChangeType::Removed => "-".red(),
        ChangeType::Modified => "~".yellow(),
        ChangeType::Moved => "→".cyan(),
    };
    let location = if op.path.is_empty() { "/" } else { op.path.as_str() };
    format!("{} {} {}", marker, op.description, location.dimmed())
}
