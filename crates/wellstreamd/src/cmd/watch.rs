//! Watch command - follow a running gateway
//!
//! A thin wrapper around `ViewerClient` that prints every event to stdout.
//! Doubles as a connectivity probe: it reports drops and keeps reconnecting
//! until interrupted.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use wellstream_client::{ClientConfig, ViewerClient, ViewerEvent};
use wellstream_config::{Config, ViewerConfig};

/// Watch command arguments
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Gateway WebSocket URL; defaults to the [viewer] url from the config file
    #[arg(long)]
    pub url: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "configs/wellstream.toml")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Print samples only, no status lines
    #[arg(short, long)]
    pub quiet: bool,
}

/// Run the watch command
pub async fn run(args: WatchArgs) -> Result<()> {
    crate::init_logging(&args.log_level)?;

    let defaults = viewer_defaults(&args.config);
    let config = ClientConfig {
        url: args.url.unwrap_or(defaults.url),
        reconnect_delay: defaults.reconnect_delay,
        ping_interval: defaults.ping_interval,
    };

    if !args.quiet {
        info!(url = %config.url, "watching gateway (Ctrl+C to stop)");
    }

    let (client, mut events) = ViewerClient::open(config);

    // Main loop with signal handling
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event, args.quiet),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                if !args.quiet {
                    info!("interrupted, shutting down");
                }
                break;
            }
        }
    }

    client.close().await;
    Ok(())
}

/// The [viewer] section of the config file, or defaults when it is unusable
fn viewer_defaults(path: &Path) -> ViewerConfig {
    if !path.exists() {
        return ViewerConfig::default();
    }
    match Config::from_file(path) {
        Ok(config) => config.viewer,
        Err(error) => {
            warn!(%error, config = %path.display(), "ignoring unreadable configuration file");
            ViewerConfig::default()
        }
    }
}

/// Print one event to stdout
fn print_event(event: &ViewerEvent, quiet: bool) {
    match event {
        ViewerEvent::Sample(sample) => {
            println!(
                "depth {:>9.2} m  rop {:>6.2} m/h  time {}",
                sample.depth, sample.rop, sample.time
            );
        }
        ViewerEvent::Connected if !quiet => println!("# connected"),
        ViewerEvent::Welcome { clients } if !quiet => {
            println!("# welcome, {clients} viewer(s) online");
        }
        ViewerEvent::Disconnected if !quiet => println!("# link lost, reconnecting"),
        _ => {}
    }
}
