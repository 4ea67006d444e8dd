//! Folio CLI - Command-line interface for EPUB metadata enrichment

mod backup;
mod commands;
mod scan;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate jobs argument (must be at least 1)
fn parse_jobs(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("jobs must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not contact any remote source
    #[arg(long, global = true)]
    offline: bool,

    /// Directory for backups taken before a file is rewritten
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the metadata stored in an EPUB file
    Info {
        /// Input file path
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch metadata suggestions for an EPUB file
    Enrich {
        /// Input file path
        input: String,

        /// Write the suggestions into the file
        #[arg(long)]
        apply: bool,

        /// Rename the file after its metadata once applied
        #[arg(long, requires = "apply")]
        rename: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enrich every EPUB file under a directory
    Batch {
        /// Input directory
        input_dir: String,

        /// Write the suggestions into each file
        #[arg(long)]
        apply: bool,

        /// Rename each file after its metadata once applied
        #[arg(long, requires = "apply")]
        rename: bool,

        /// Number of parallel jobs (must be at least 1)
        #[arg(short, long, default_value = "4", value_parser = parse_jobs)]
        jobs: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "folio_cli=debug,folio_core=debug"
    } else {
        "folio_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let options = commands::Options {
        offline: cli.offline,
        backup_dir: cli.backup_dir,
    };

    match cli.command {
        Commands::Info { input, json } => commands::info(&input, json),

        Commands::Enrich {
            input,
            apply,
            rename,
            json,
        } => commands::enrich(&input, &options, apply, rename, json),

        Commands::Batch {
            input_dir,
            apply,
            rename,
            jobs,
        } => commands::batch(&input_dir, &options, apply, rename, jobs),
    }
}
