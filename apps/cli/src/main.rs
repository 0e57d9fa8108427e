//! QCC CLI - Command-line interface for the QCC experiment harness
//!
//! Acquires a local backend, runs a training stage and a validation stage
//! against it, prints timestamped backend diagnostics and the observed miss rate.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use qcc_core::DiagnosticsOutput;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::run::RunOptions;

/// QCC CLI - two-stage experiment harness
#[derive(Parser, Debug)]
#[command(
    name = "qcc",
    author,
    version,
    about = "QCC - train and validate a classifier against a pluggable backend",
    long_about = "Runs a training stage followed by a validation stage against one backend instance.\nBackend diagnostics are printed with elapsed and delta timestamps; the final line reports the observed miss rate."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file, merged over ~/.qcc/config.toml and ./.qccrc
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an experiment plan
    ///
    /// Trains, then validates with the trained parameters, then prints
    /// "Observed miss rate of <pct>%.".
    Run {
        /// Experiment plan (TOML)
        plan: PathBuf,

        /// Print the full run report as JSON instead of the report line
        #[arg(long)]
        json: bool,

        /// Backend register width
        #[arg(long)]
        qubits: Option<u32>,

        /// Memory the backend may claim, in MiB
        #[arg(long)]
        memory_limit_mb: Option<u64>,

        /// Where timestamped diagnostics go (stdout, tracing, off)
        #[arg(long)]
        diagnostics: Option<DiagnosticsOutput>,
    },

    /// Show the effective configuration
    Config,
}

fn parse_level(level: &str) -> Level {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration before tracing so the configured level applies.
    let mut cli_config = config::load_config(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        cli_config.log_level = Some(level);
    }
    cli_config.validate()?;

    // Initialize tracing; stdout is reserved for diagnostics and the report.
    let level = parse_level(cli_config.log_level.as_deref().unwrap_or("info"));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Run { plan, json, qubits, memory_limit_mb, diagnostics } => {
            let options = RunOptions { plan, json, qubits, memory_limit_mb, diagnostics };
            commands::run::execute(options, cli_config).await?;
        }
        Command::Config => {
            commands::config::execute(&cli_config)?;
        }
    }

    Ok(())
}
