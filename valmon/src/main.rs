use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use valmon::config::{AppConfig, write_default};
use valmon::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "valmon")]
#[command(version, about = "Validator monitoring and alerting daemon", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start monitoring
    Start {
        /// Configuration file (default: ~/.valmon/config.toml)
        #[arg(short, long, env = "VALMON_CONFIG")]
        config: Option<PathBuf>,

        /// Write logs to this file as JSON instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },
    /// Write a default configuration file
    Init {
        /// Destination (default: ~/.valmon/config.toml)
        #[arg(short, long, env = "VALMON_CONFIG")]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    match args.command {
        Commands::Start {
            config,
            output,
            debug,
        } => start(config, output, debug).await,
        Commands::Init { config, force } => {
            let path = match config {
                Some(path) => path,
                None => AppConfig::default_path()?,
            };
            write_default(&path, force)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
        Commands::Version => {
            println!("valmon {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start(config: Option<PathBuf>, output: Option<PathBuf>, debug: bool) -> anyhow::Result<()> {
    let config = AppConfig::load(config.as_deref()).context("Failed to load configuration")?;
    config.validate()?;

    let _guard = init_logging(output.as_deref(), debug)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received");
        signal_cancel.cancel();
    });

    if let Err(e) = valmon::app::run(config, cancel).await {
        error!(error = %e, "valmon exited with an error");
        return Err(e.into());
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to register SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
