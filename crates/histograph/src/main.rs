//! Histograph CLI - Per-commit call graphs from the command line.
//!
//! Histograph walks a repository's history, builds a Java call graph for
//! every commit and reports which methods each commit changed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

/// Histograph: Call graphs across a repository's history.
#[derive(Parser)]
#[command(name = "histograph")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Repository directory (defaults to current directory)
    #[arg(short, long, global = true)]
    repo: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every command that builds graphs.
#[derive(Args, Debug, Default)]
pub struct WalkArgs {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip files and directories with this name (repeatable)
    #[arg(long = "ignore", value_name = "NAME")]
    ignore: Vec<String>,

    /// Skip paths matching this regex (relative to the repository root)
    #[arg(long, value_name = "REGEX")]
    ignore_pattern: Option<String>,

    /// Worker threads per graph build
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a call graph for every commit and report changed methods
    Walk {
        #[command(flatten)]
        args: WalkArgs,

        /// Only visit the oldest N commits
        #[arg(short, long)]
        limit: Option<usize>,

        /// Emit one JSON object per commit
        #[arg(long)]
        json: bool,

        /// Leave the last visited commit checked out
        #[arg(long)]
        no_restore: bool,
    },

    /// List the commits a walk would visit, oldest first
    Commits {
        /// Only list the oldest N commits
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Build the call graph of the working tree as it is
    Snapshot {
        #[command(flatten)]
        args: WalkArgs,

        /// Emit the graph as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Determine repository root
    let repo = match cli.repo {
        Some(r) => r,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!(
                    "{}: failed to get current directory: {e}",
                    "error".red().bold()
                );
                return ExitCode::FAILURE;
            }
        },
    };

    let result = match cli.command {
        Commands::Walk {
            args,
            limit,
            json,
            no_restore,
        } => cli::walk::run(&repo, &args, limit, json, !no_restore),
        Commands::Commits { limit } => cli::commits::run(&repo, limit),
        Commands::Snapshot { args, json } => cli::snapshot::run(&repo, &args, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
