mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use commands::{diff, merge, patch, validate, DiffArgs, MergeArgs, PatchArgs, ValidateArgs};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Canvas CLI - validate, diff, patch and merge design documents
#[derive(Parser, Debug)]
#[command(name = "canvas")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ./canvas.config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check documents against the schema
    Validate(ValidateArgs),

    /// Show what changed between two documents
    Diff(DiffArgs),

    /// Apply a JSON patch list to a document
    Patch(PatchArgs),

    /// Three-way merge of two edits of the same base
    Merge(MergeArgs),
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Cannot get current directory")?;
    let config = Config::load(&cwd, cli.config.as_deref())?;

    match cli.command {
        Command::Validate(args) => validate(args),
        Command::Diff(args) => diff(args, &config),
        Command::Patch(args) => patch(args, &config),
        Command::Merge(args) => merge(args, &config),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
