//! Binary entry point for sqlquad.
//!
//! This binary provides the CLI interface for the sqlquad quad store.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::PatternArgs;
use sqlquad::config::StoreConfig;
use sqlquad::observability::{self, LoggingConfig};
use sqlquad::storage::SqliteQuadStore;
use std::path::PathBuf;
use std::process::ExitCode;

/// sqlquad - RDF-style quads in `SQLite`.
#[derive(Parser)]
#[command(name = "sqlquad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides configuration).
    #[arg(long, global = true, env = "SQLQUAD_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the tables.
    Init,

    /// Drop the tables and every quad in them.
    Drop {
        /// Confirm the drop.
        #[arg(long)]
        yes: bool,
    },

    /// Import quads from a JSON Lines file.
    Import {
        /// Input file, or `-` for stdin.
        file: PathBuf,

        /// Quads per batch.
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Write matching quads to stdout as JSON Lines.
    Export {
        #[command(flatten)]
        pattern: PatternArgs,
    },

    /// Count matching quads.
    Count {
        #[command(flatten)]
        pattern: PatternArgs,

        /// Sample large tables instead of counting every row.
        #[arg(long)]
        estimate: bool,
    },

    /// Remove matching quads.
    Remove {
        #[command(flatten)]
        pattern: PatternArgs,
    },

    /// Remove every quad in a graph.
    DeleteGraph {
        /// Graph term, e.g. `<http://ex.com/g>` or `DEFAULT`.
        graph: String,
    },

    /// Delete vertexes no quad uses.
    Vacuum {
        /// Refresh planner statistics afterwards.
        #[arg(long)]
        analyze: bool,
    },

    /// Show table sizes.
    Stats,
}

fn main() -> ExitCode {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.db.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_logging(LoggingConfig::from_settings(
        Some(&config.logging),
        cli.verbose,
    )) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration: file (explicit or default location), then
/// environment, then the `--db` flag.
fn load_config(path: Option<&std::path::Path>, db: Option<PathBuf>) -> anyhow::Result<StoreConfig> {
    let config = match path {
        Some(path) => StoreConfig::load_from_file(path)?,
        None => StoreConfig::load_default(),
    };
    let mut config = config.apply_env()?;
    if let Some(db) = db {
        config.db_path = db;
    }
    config.validate()?;
    Ok(config)
}

/// Runs the selected command.
fn run_command(command: Commands, config: StoreConfig) -> anyhow::Result<()> {
    let store = SqliteQuadStore::from_config(config)?;

    match command {
        Commands::Init => commands::cmd_init(&store),
        Commands::Drop { yes } => commands::cmd_drop(&store, yes),
        Commands::Import { file, batch_size } => commands::cmd_import(&store, &file, batch_size),
        Commands::Export { pattern } => commands::cmd_export(&store, &pattern),
        Commands::Count { pattern, estimate } => commands::cmd_count(&store, &pattern, estimate),
        Commands::Remove { pattern } => commands::cmd_remove(&store, &pattern),
        Commands::DeleteGraph { graph } => commands::cmd_delete_graph(&store, &graph),
        Commands::Vacuum { analyze } => commands::cmd_vacuum(&store, analyze),
        Commands::Stats => commands::cmd_stats(&store),
    }
}
