use clap::Parser;
use eyre::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::run::RunArgs;
use lineage_client::config::{self, LineageConfig};
use lineage_client::LogLevel;

fn setup_logging(log_level: &LogLevel) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lineage")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("lineage.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(log_level.level_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Emit { file, target } => commands::emit::run(file, &target, config_path),
        Commands::Run {
            state,
            namespace,
            job,
            run_id,
            producer,
            inputs,
            outputs,
            print,
            target,
        } => {
            let args = RunArgs {
                event_type: state.into(),
                namespace,
                job,
                run_id,
                producer,
                inputs,
                outputs,
            };
            commands::run::run(args, print, &target, config_path)
        }
        Commands::Config { action } => commands::config::run(action, config_path),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in LineageConfig::load are silent).
    // A broken config only matters to commands that resolve a transport, and they report it.
    let env = config::lineage_env();
    let search_paths = config::default_search_paths();
    let (config, load_error) = match LineageConfig::load(cli.config.as_deref(), &env, &search_paths) {
        Ok((config, _)) => (config, None),
        Err(e) => (LineageConfig::default(), Some(e)),
    };

    // Setup logging with log level from config (or RUST_LOG env var)
    setup_logging(&config.log_level).context("Failed to setup logging")?;

    if let Some(e) = load_error {
        warn!("Using default log settings: {}", e);
    }

    info!("Starting lineage with config from: {:?}", cli.config);

    run(cli).context("Command failed")?;

    Ok(())
}
