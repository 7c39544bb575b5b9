use super::read_json;
use anyhow::{anyhow, Result};
use canvas_document::{validate as validate_document, CanvasDocument};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Document files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let mut failed = 0;

    for file in &args.files {
        let doc: CanvasDocument = match read_json(file) {
            Ok(doc) => doc,
            Err(e) => {
                failed += 1;
                eprintln!("  {} {} - {:#}", "✗".red(), file.display(), e);
                continue;
            }
        };

        let report = validate_document(&doc);
        if report.success {
            eprintln!(
                "  {} {} ({} nodes)",
                "✓".green(),
                file.display(),
                doc.node_count()
            );
        } else {
            failed += 1;
            eprintln!("  {} {}", "✗".red(), file.display());
            for issue in &report.errors {
                eprintln!("      {} {}", issue.path.dimmed(), issue.message);
            }
        }
    }

    eprintln!();
    if failed == 0 {
        eprintln!("{} {} documents valid", "✅".green(), args.files.len());
        Ok(())
    } else {
        Err(anyhow!("{} of {} documents failed validation", failed, args.files.len()))
    }
}
