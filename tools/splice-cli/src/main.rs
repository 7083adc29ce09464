//! Splice CLI — Command-line interface for validating, planning, and exporting timelines.
//!
//! Usage:
//!   splice export <REQUEST>      Render an export request to a video file
//!   splice plan <REQUEST>        Print the render plan without running it
//!   splice validate <REQUEST>    Check a request and show its compiled timeline
//!   splice fonts                 Report font catalog availability
//!   splice check                 Check transcoder and prober availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use splice_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "splice",
    about = "Compile edited timelines into finished videos with ffmpeg",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/splice/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an export request to a video file
    Export {
        /// Path to the export request JSON
        request: PathBuf,

        /// Output file path (defaults to "<project name>.mp4")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the render plan without fetching or encoding
    Plan {
        /// Path to the export request JSON
        request: PathBuf,

        /// Output file path used in the plan
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a request and show its compiled timeline
    Validate {
        /// Path to the export request JSON
        request: PathBuf,
    },

    /// Report which catalog fonts are installed and usable
    Fonts {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    splice_common::logging::init_logging(&config.logging);
    tracing::debug!(work_dir = %config.work_dir.display(), "Configuration loaded");

    match cli.command {
        Commands::Export {
            request,
            output,
            json,
        } => commands::export::run(config, request, output, json).await,
        Commands::Plan {
            request,
            output,
            json,
        } => commands::plan::run(config, request, output, json),
        Commands::Validate { request } => commands::validate::run(request),
        Commands::Fonts { json } => commands::fonts::run(&config, json),
        Commands::Check => commands::check::run(config),
    }
}
