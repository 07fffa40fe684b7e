//! TempoDB CLI
//!
//! Command-line tools for planning and applying temporal merges.
//!
//! # Commands
//!
//! - `plan` - Compute and print a merge plan without applying it
//! - `merge` - Plan and apply a source batch, printing feedback
//! - `modes` - List the available merge and delete modes
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// TempoDB command-line merge tools.
#[derive(Parser)]
#[command(name = "tempodb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and print the merge plan without touching the target
    Plan {
        /// Path to the table schema (JSON)
        #[arg(long)]
        schema: PathBuf,

        /// Path to the target seed rows (JSON array); empty table if omitted
        #[arg(long)]
        target: Option<PathBuf>,

        /// Path to the source batch (JSON array)
        #[arg(long)]
        source: PathBuf,

        /// Merge mode, e.g. MERGE_ENTITY_UPSERT
        #[arg(short, long, default_value = "MERGE_ENTITY_UPSERT")]
        mode: String,

        /// Delete mode (NONE, DELETE_MISSING_TIMELINE, DELETE_MISSING_ENTITIES,
        /// DELETE_MISSING_TIMELINE_AND_ENTITIES)
        #[arg(long, default_value = "NONE")]
        delete_mode: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Plan and apply a source batch, printing per-row feedback
    Merge {
        /// Path to the table schema (JSON)
        #[arg(long)]
        schema: PathBuf,

        /// Path to the target seed rows (JSON array); empty table if omitted
        #[arg(long)]
        target: Option<PathBuf>,

        /// Path to the source batch (JSON array)
        #[arg(long)]
        source: PathBuf,

        /// Merge mode, e.g. MERGE_ENTITY_UPSERT
        #[arg(short, long, default_value = "MERGE_ENTITY_UPSERT")]
        mode: String,

        /// Delete mode
        #[arg(long, default_value = "NONE")]
        delete_mode: String,

        /// Write the resulting table state to this file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List available merge and delete modes
    Modes,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Plan {
            schema,
            target,
            source,
            mode,
            delete_mode,
            format,
        } => {
            commands::plan::run(
                &schema,
                target.as_deref(),
                &source,
                &mode,
                &delete_mode,
                &format,
            )?;
        }
        Commands::Merge {
            schema,
            target,
            source,
            mode,
            delete_mode,
            output,
            format,
        } => {
            commands::merge::run(
                &schema,
                target.as_deref(),
                &source,
                &mode,
                &delete_mode,
                output.as_deref(),
                &format,
            )?;
        }
        Commands::Modes => {
            commands::modes::run();
        }
        Commands::Version => {
            println!("TempoDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("TempoDB Engine v{}", tempodb_engine::VERSION);
        }
    }

    Ok(())
}
