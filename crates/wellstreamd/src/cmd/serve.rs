//! Serve command - run the telemetry pipeline
//!
//! The composition root. Every component is an explicit instance built
//! here and handed to its collaborators; nothing lives in globals. On
//! shutdown the pipeline is torn down in order: viewers first, the broker
//! link second, the store writer last, all bounded by one deadline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use wellstream_bus::SampleBus;
use wellstream_config::Config;
use wellstream_gateway::{Gateway, GatewayConfig};
use wellstream_ingest::{BrokerConnector, ConnectorConfig, SampleIntake};
use wellstream_store::{MemoryStore, StoreWriter};

/// Arguments for `serve`
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/wellstream.toml")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the [log] section
    #[arg(short, long)]
    pub log_level: Option<String>,
}

/// Load configuration, initialize logging, run the pipeline
pub async fn run(args: ServeArgs) -> Result<()> {
    let (config, config_missing) = load_config(&args.config)?;

    let level = args
        .log_level
        .as_deref()
        .unwrap_or(config.log.level.as_str());
    crate::init_logging(level)?;

    if config_missing {
        warn!(
            config = %args.config.display(),
            "configuration file not found, using defaults"
        );
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        pid = std::process::id(),
        config = %args.config.display(),
        "wellstream starting"
    );

    if let Err(e) = run_pipeline(config).await {
        error!(error = %e, "pipeline error");
        return Err(e);
    }

    info!("wellstream shutdown complete");
    Ok(())
}

/// Build the pipeline, run until a shutdown signal, tear down in order
async fn run_pipeline(config: Config) -> Result<()> {
    // fan-out bus, shared by ingestion and the gateway
    let bus = Arc::new(SampleBus::with_queue_capacity(config.gateway.sample_queue));

    // optional persistence behind a bounded queue
    let writer = if config.store.enabled {
        info!(
            max_rows = config.store.max_rows,
            queue_size = config.store.queue_size,
            "in-memory store enabled"
        );
        let store = Arc::new(MemoryStore::with_max_rows(config.store.max_rows));
        Some(StoreWriter::spawn(store, config.store.queue_size))
    } else {
        None
    };

    let intake = SampleIntake::new(
        Arc::clone(&bus),
        writer.as_ref().map(|writer| writer.queue()),
    );

    let gateway = Gateway::bind(gateway_config(&config), Arc::clone(&bus))
        .await
        .context("gateway failed to start")?;

    // the broker may be down; the gateway serves viewers regardless, they
    // just see no data until the link comes up on a restart
    let connector = if config.broker.enabled {
        match BrokerConnector::connect(connector_config(&config), intake).await {
            Ok(connector) => Some(connector),
            Err(error) => {
                warn!(%error, "broker link not established, serving without live ingestion");
                None
            }
        }
    } else {
        info!("broker link disabled, serving without ingestion");
        // releases the intake's store queue handle so the writer can drain
        drop(intake);
        None
    };

    info!(address = %gateway.local_addr(), "pipeline ready");

    wait_for_shutdown().await;

    let deadline = config.shutdown.timeout;
    if timeout(deadline, shutdown(gateway, connector, writer))
        .await
        .is_err()
    {
        error!(
            timeout_secs = deadline.as_secs(),
            "shutdown deadline passed, exiting anyway"
        );
    }

    Ok(())
}

/// Tear the pipeline down in dependency order
///
/// Gateway first so every viewer gets an orderly close, the broker link
/// second, the store writer last so samples already queued still land.
async fn shutdown(
    gateway: Gateway,
    connector: Option<BrokerConnector>,
    writer: Option<StoreWriter>,
) {
    gateway.close().await;
    if let Some(connector) = connector {
        connector.disconnect().await;
    }
    if let Some(writer) = writer {
        writer.close().await;
    }
}

/// Read the config file, treating a missing file as an empty one
fn load_config(path: &Path) -> Result<(Config, bool)> {
    if !path.exists() {
        return Ok((Config::default(), true));
    }
    let config = Config::from_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok((config, false))
}

/// Map the [gateway] section onto the server's runtime config
fn gateway_config(config: &Config) -> GatewayConfig {
    GatewayConfig {
        address: config.gateway.address.clone(),
        port: config.gateway.port,
        max_connections: config.gateway.max_connections,
        ping_interval: config.gateway.ping_interval,
    }
}

/// Map the [broker] section onto the connector's runtime config
fn connector_config(config: &Config) -> ConnectorConfig {
    let broker = &config.broker;
    ConnectorConfig {
        host: broker.host.clone(),
        port: broker.port,
        topic: broker.topic.clone(),
        publish_topic: broker.publish_topic.clone(),
        client_id: broker
            .client_id
            .clone()
            .unwrap_or_else(|| format!("wellstream-{}", std::process::id())),
        keepalive: broker.keepalive,
        clean_session: broker.clean_session,
        connect_timeout: broker.connect_timeout,
        reconnect_delay: broker.reconnect_delay,
        max_reconnect_attempts: broker.max_reconnect_attempts,
    }
}

/// Block until SIGINT or SIGTERM arrives
async fn wait_for_shutdown() {
    let interrupt = async {
        signal::ctrl_c()
            .await
            .expect("failed to listen for Ctrl+C");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
