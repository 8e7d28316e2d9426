//! ChessDB CLI
//!
//! Command-line tools for ChessDB entity index files. The commands work on
//! any entity kind: they read node slots without decoding records.
//!
//! # Commands
//!
//! - `inspect` - Display header metadata and slot statistics
//! - `verify` - Verify header checksum, free list, counts and tree balance

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ChessDB command-line index tools.
#[derive(Parser)]
#[command(name = "chessdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the index file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format of `inspect`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Display header metadata and slot statistics
    Inspect {
        /// List every slot
        #[arg(short, long)]
        slots: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Verify index integrity
    Verify,

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
        Commands::Inspect { slots, format } => {
            let path = cli.path.ok_or("Index path required for inspect")?;
            commands::inspect::run(&path, slots, format == OutputFormat::Json)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Index path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Version => {
            println!("ChessDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("ChessDB Core v{}", chessdb_core::VERSION);
        }
    }

    Ok(())
}
