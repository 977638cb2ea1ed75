//! WebSocket server and per-connection pumps

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use wellstream_bus::{SampleBus, SubscriberHandle};
use wellstream_protocol::{ClientFrame, ServerFrame, now_rfc3339};

use crate::error::GatewayError;
use crate::registry::ConnectionRegistry;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind address
    pub address: String,

    /// Listen port (0 picks an ephemeral port)
    pub port: u16,

    /// Viewer connections admitted at once
    pub max_connections: usize,

    /// Interval between protocol-level liveness probes
    pub ping_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 8081,
            max_connections: 100,
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Gateway counters
#[derive(Debug, Default)]
struct GatewayMetrics {
    /// Connections accepted over the gateway's lifetime
    accepted: AtomicU64,
    /// Connections refused by the cap or during shutdown
    refused: AtomicU64,
    /// Frames written downstream
    frames_sent: AtomicU64,
    /// Sends that pruned a connection
    send_failures: AtomicU64,
}

/// Snapshot of gateway counters
#[derive(Debug, Clone, Copy)]
pub struct GatewayStats {
    /// Currently live connections
    pub active: usize,
    pub total_accepted: u64,
    pub refused: u64,
    pub frames_sent: u64,
    pub send_failures: u64,
}

/// State shared by the accept path and every connection pump
#[derive(Debug)]
struct GatewayShared {
    config: GatewayConfig,
    bus: Arc<SampleBus>,
    registry: ConnectionRegistry,
    metrics: GatewayMetrics,
    accepting: AtomicBool,
}

/// Running gateway server
#[derive(Debug)]
pub struct Gateway {
    shared: Arc<GatewayShared>,
    local_addr: SocketAddr,
    cancel: CancellationToken,
    server: JoinHandle<()>,
}

impl Gateway {
    /// Bind the listener and start serving viewer connections
    pub async fn bind(config: GatewayConfig, bus: Arc<SampleBus>) -> Result<Self, GatewayError> {
        let address = format!("{}:{}", config.address, config.port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| GatewayError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| GatewayError::Bind { address, source })?;

        let shared = Arc::new(GatewayShared {
            config,
            bus,
            registry: ConnectionRegistry::new(),
            metrics: GatewayMetrics::default(),
            accepting: AtomicBool::new(true),
        });

        let app = Router::new()
            .route("/", get(ws_handler))
            .route("/healthz", get(healthz))
            .with_state(Arc::clone(&shared));

        let cancel = CancellationToken::new();
        let server = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                let service = app.into_make_service_with_connect_info::<SocketAddr>();
                if let Err(error) = axum::serve(listener, service)
                    .with_graceful_shutdown(cancel.cancelled_owned())
                    .await
                {
                    error!(%error, "gateway server failed");
                }
            }
        });

        info!(address = %local_addr, "gateway listening");
        Ok(Self {
            shared,
            local_addr,
            cancel,
            server,
        })
    }

    /// Address the gateway is actually listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Currently live viewer connections
    pub fn connection_count(&self) -> usize {
        self.shared.registry.count()
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            active: self.shared.registry.count(),
            total_accepted: self.shared.metrics.accepted.load(Ordering::Relaxed),
            refused: self.shared.metrics.refused.load(Ordering::Relaxed),
            frames_sent: self.shared.metrics.frames_sent.load(Ordering::Relaxed),
            send_failures: self.shared.metrics.send_failures.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting, tear down every connection, then stop the server
    ///
    /// Each pump unsubscribes from the bus and closes its transport before
    /// dropping its membership entry; the server future resolves once the
    /// last of them is gone.
    pub async fn close(self) {
        info!(
            clients = self.shared.registry.count(),
            "closing gateway"
        );
        self.shared.accepting.store(false, Ordering::Relaxed);
        self.shared.registry.close_all();
        self.cancel.cancel();
        if let Err(error) = self.server.await {
            warn!(%error, "gateway server task panicked");
        }
        info!("gateway closed");
    }
}

/// Upgrade handler for the viewer endpoint
async fn ws_handler(
    State(shared): State<Arc<GatewayShared>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    if !shared.accepting.load(Ordering::Relaxed)
        || shared.registry.count() >= shared.config.max_connections
    {
        shared.metrics.refused.fetch_add(1, Ordering::Relaxed);
        debug!(%peer, "refusing viewer connection");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, shared, peer))
}

/// Liveness endpoint
async fn healthz(State(shared): State<Arc<GatewayShared>>) -> Json<Value> {
    let bus = shared.bus.stats();
    Json(json!({
        "status": "ok",
        "clients": shared.registry.count(),
        "stream": {
            "subscribers": bus.subscribers,
            "published": bus.published,
            "delivered": bus.delivered,
            "dropped": bus.dropped,
        },
        "timestamp": now_rfc3339(),
    }))
}

/// Unsubscribes and deregisters when the pump exits, however it exits
struct ConnectionGuard {
    shared: Arc<GatewayShared>,
    subscription: SubscriberHandle,
    id: u64,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.shared.bus.unsubscribe(&self.subscription);
        self.shared.registry.deregister(self.id);
        debug!(
            id = self.id,
            clients = self.shared.registry.count(),
            "connection removed"
        );
    }
}

/// Pump for one viewer connection
///
/// Sends the welcome frame, then forwards every bus sample to the socket
/// until the viewer leaves, a send fails, or the gateway shuts down.
async fn handle_socket(mut socket: WebSocket, shared: Arc<GatewayShared>, peer: SocketAddr) {
    let Some(connection) = shared
        .registry
        .register(peer, shared.config.max_connections)
    else {
        debug!(%peer, "viewer refused at registration");
        shared.metrics.refused.fetch_add(1, Ordering::Relaxed);
        return;
    };
    shared.metrics.accepted.fetch_add(1, Ordering::Relaxed);

    let (subscription, mut samples) = shared.bus.subscribe();
    let guard = ConnectionGuard {
        shared: Arc::clone(&shared),
        subscription,
        id: connection.id,
    };

    let clients = shared.registry.count();
    info!(%peer, id = connection.id, clients, "viewer connected");

    // welcome is always the first frame on the wire
    if !send_frame(&mut socket, &ServerFrame::welcome(clients), &shared).await {
        return;
    }

    let mut probe = tokio::time::interval(shared.config.ping_interval);

    loop {
        tokio::select! {
            _ = connection.cancel.cancelled() => {
                debug!(id = connection.id, "connection cancelled by shutdown");
                break;
            }

            sample = samples.recv() => {
                let Some(sample) = sample else {
                    // the bus dropped this subscriber
                    break;
                };
                if !send_frame(&mut socket, &ServerFrame::rop_data(&sample), &shared).await {
                    break;
                }
            }

            _ = probe.tick() => {
                trace!(
                    id = connection.id,
                    idle_ms = connection.idle().as_millis() as u64,
                    "liveness probe"
                );
                if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                    shared.metrics.send_failures.fetch_add(1, Ordering::Relaxed);
                    debug!(id = connection.id, "liveness probe failed, pruning connection");
                    break;
                }
            }

            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        connection.touch();
                        match ClientFrame::from_json(&text) {
                            Ok(ClientFrame::Ping) => {
                                if !send_frame(&mut socket, &ServerFrame::pong(), &shared).await {
                                    break;
                                }
                            }
                            Err(error) => {
                                // accepted but not acted on
                                trace!(id = connection.id, %error, "ignoring inbound payload");
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => connection.touch(),
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(id = connection.id, "viewer closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        debug!(id = connection.id, %error, "viewer transport error");
                        break;
                    }
                }
            }
        }
    }

    // ordered teardown: subscription first, then the transport; the guard
    // drop clears membership last
    shared.bus.unsubscribe(&guard.subscription);
    let _ = socket.send(Message::Close(None)).await;
    info!(
        id = connection.id,
        peer = %connection.peer,
        session_secs = connection.connected_at.elapsed().as_secs(),
        "viewer disconnected"
    );
    drop(guard);
}

/// Serialize and send one frame, counting the outcome
///
/// Returns false when the transport is dead and the connection must go.
async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame, shared: &GatewayShared) -> bool {
    let json = match frame.to_json() {
        Ok(json) => json,
        Err(error) => {
            warn!(%error, "frame could not be serialized");
            return true;
        }
    };
    match socket.send(Message::Text(json.into())).await {
        Ok(()) => {
            shared.metrics.frames_sent.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(error) => {
            shared.metrics.send_failures.fetch_add(1, Ordering::Relaxed);
            debug!(%error, "downstream send failed");
            false
        }
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
