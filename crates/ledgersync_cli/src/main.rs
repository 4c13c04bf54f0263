//! ledgersync CLI
//!
//! Command-line tools for ledgersync mirror files.
//!
//! # Commands
//!
//! - `inspect` - Display record counts per entity type
//! - `pending` - List records awaiting confirmation
//! - `clear` - Delete every record
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ledgersync mirror tools.
#[derive(Parser)]
#[command(name = "ledgersync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the mirror file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display record counts per entity type
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List records submitted but not yet confirmed
    Pending {
        /// Only list this entity type
        #[arg(short, long)]
        kind: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete every record in the mirror
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Mirror path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Pending { kind, format } => {
            let path = cli.path.ok_or("Mirror path required for pending")?;
            commands::pending::run(&path, kind.as_deref(), &format)?;
        }
        Commands::Clear { yes } => {
            let path = cli.path.ok_or("Mirror path required for clear")?;
            commands::clear::run(&path, yes)?;
        }
        Commands::Version => {
            println!("ledgersync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("mirror format v{}", ledgersync_core::MIRROR_FORMAT_VERSION);
        }
    }

    Ok(())
}
