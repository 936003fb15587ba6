//! Umbra CLI.
//!
//! Inspection tools for the simulation harness.
//!
//! # Quick Start
//!
//! ```bash
//! # How would a test asking for "fr-rCA-land" be configured on API 23?
//! umbra qualifiers fr-rCA-land --api-level 23
//!
//! # Which configuration fields apply at which API level?
//! umbra gates
//!
//! # Effective harness configuration of a project
//! umbra config --project-dir ./my-app
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Umbra - deterministic platform simulation for unit tests.
#[derive(Parser)]
#[command(name = "umbra")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Resolve a qualifier string the way test set-up does.
    Qualifiers {
        /// Explicit qualifiers, e.g. "en-rUS-land". May be empty.
        qualifiers: String,

        /// Simulated API level (defaults to the project's configured level).
        #[arg(short, long)]
        api_level: Option<u16>,

        /// Project directory whose configuration supplies the defaults.
        #[arg(short, long, default_value = ".")]
        project_dir: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print the per-field API level gates of the device configuration.
    Gates {
        /// Mark which fields apply at this API level.
        #[arg(short, long)]
        api_level: Option<u16>,
    },

    /// Print the effective harness configuration.
    Config {
        /// Project directory (where umbra.toml lives).
        #[arg(short, long, default_value = ".")]
        project_dir: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Toml,
    Json,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Qualifiers {
            qualifiers,
            api_level,
            project_dir,
            format,
        } => commands::qualifiers::run(&qualifiers, api_level, &project_dir, format),
        Commands::Gates { api_level } => {
            commands::gates::run(api_level);
            Ok(())
        }
        Commands::Config {
            project_dir,
            format,
        } => commands::config::show(&project_dir, format),
    }
}
