//! Wellstream - drilling telemetry fan-out daemon
//!
//! # Usage
//!
//! ```bash
//! # Run the pipeline (default)
//! wellstreamd
//! wellstreamd --config configs/wellstream.toml
//!
//! # Follow a running gateway from another terminal
//! wellstreamd watch
//! wellstreamd watch --url ws://rig7.local:8081/
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Wellstream - drilling telemetry fan-out daemon
#[derive(Parser, Debug)]
#[command(name = "wellstreamd")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file
    #[arg(short, long, default_value = "configs/wellstream.toml")]
    config: std::path::PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the [log] section
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the telemetry pipeline
    Serve(cmd::serve::ServeArgs),

    /// Follow a running gateway and print its frames
    Watch(cmd::watch::WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(args)) => cmd::serve::run(args).await,
        // Watch initializes its own logging
        Some(Command::Watch(args)) => cmd::watch::run(args).await,
        // No subcommand = run the pipeline (default behavior)
        None => {
            cmd::serve::run(cmd::serve::ServeArgs {
                config: cli.config,
                log_level: cli.log_level,
            })
            .await
        }
    }
}

/// Initialize the tracing subscriber
///
/// A `RUST_LOG` filter in the environment wins over the configured level.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log filter: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    Ok(())
}
