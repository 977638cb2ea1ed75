//! Gateway link lifecycle for viewers
//!
//! A `ViewerClient` owns one downstream link: it dials the gateway, decodes
//! server frames into `ViewerEvent`s, and heals every drop with a
//! fixed-delay reconnect. There is no retry budget on this side; the link
//! keeps coming back until the handle is closed.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use wellstream_protocol::{ClientFrame, ServerFrame, TelemetrySample};

use crate::state::{ClientPhase, ClientState, ClientStatus};

/// Capacity of the event channel handed to the consumer
const EVENT_QUEUE_CAPACITY: usize = 64;

type GatewayLink = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Viewer link configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway WebSocket URL
    pub url: String,

    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,

    /// Interval between application-level pings
    pub ping_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8081/".into(),
            reconnect_delay: Duration::from_secs(3),
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// What the viewer application sees
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// A session opened
    Connected,
    /// The gateway's welcome, with its current viewer count
    Welcome { clients: usize },
    /// One telemetry sample
    Sample(TelemetrySample),
    /// The session dropped; a reconnect is already scheduled
    Disconnected,
}

/// Why a session's pump returned
enum PumpExit {
    Cancelled,
    LinkLost,
    ConsumerGone,
}

/// Handle to a self-healing gateway link
pub struct ViewerClient {
    state: Arc<ClientState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ViewerClient {
    /// Start the link and return the event stream
    ///
    /// Never fails: if the gateway is unreachable the client keeps dialing
    /// at the configured delay until `close` is called.
    pub fn open(config: ClientConfig) -> (Self, mpsc::Receiver<ViewerEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let state = Arc::new(ClientState::new());
        let cancel = CancellationToken::new();

        info!(url = %config.url, "opening viewer client");
        let task = tokio::spawn(run_link(
            config,
            Arc::clone(&state),
            cancel.clone(),
            events_tx,
        ));

        (
            Self {
                state,
                cancel,
                task,
            },
            events_rx,
        )
    }

    /// Whether a session is currently open
    pub fn is_connected(&self) -> bool {
        self.state.phase() == ClientPhase::Open
    }

    /// Reconnect attempts scheduled since the last open session
    pub fn attempts(&self) -> u32 {
        self.state.attempts()
    }

    /// Most recent link or parse error, if any
    pub fn last_error(&self) -> Option<String> {
        self.state.last_error()
    }

    /// Current link snapshot
    pub fn status(&self) -> ClientStatus {
        self.state.status()
    }

    /// Stop reconnecting, close a live session, and wait for the task
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(error) = self.task.await {
            warn!(%error, "viewer link task panicked");
        }
        info!("viewer client closed");
    }
}

/// Dial, pump, and reschedule for the life of the client
async fn run_link(
    config: ClientConfig,
    state: Arc<ClientState>,
    cancel: CancellationToken,
    events: mpsc::Sender<ViewerEvent>,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        state.transition(ClientPhase::Connecting);
        debug!(url = %config.url, "dialing gateway");

        match connect_async(config.url.as_str()).await {
            Ok((mut link, _response)) => {
                state.transition(ClientPhase::Open);
                state.reset_attempts();
                info!(url = %config.url, "gateway link open");
                if !deliver(&events, ViewerEvent::Connected).await {
                    break;
                }

                let exit = pump(&mut link, &config, &state, &cancel, &events).await;
                state.transition(ClientPhase::Closed);
                match exit {
                    PumpExit::Cancelled | PumpExit::ConsumerGone => break,
                    PumpExit::LinkLost => {
                        if !deliver(&events, ViewerEvent::Disconnected).await {
                            break;
                        }
                    }
                }
            }
            Err(error) => {
                state.record_error(&error);
                if state.attempts() == 0 {
                    warn!(url = %config.url, %error, "gateway not reachable");
                } else {
                    debug!(url = %config.url, %error, "gateway still not reachable");
                }
                state.transition(ClientPhase::Closed);
            }
        }

        // unconditional retry, the viewer edge has no attempt budget
        let attempt = state.record_attempt();
        debug!(
            attempt,
            delay_ms = config.reconnect_delay.as_millis() as u64,
            "scheduling gateway reconnect"
        );
        if !sleep_unless_cancelled(&cancel, config.reconnect_delay).await {
            break;
        }
    }

    state.transition(ClientPhase::Closed);
    debug!("viewer link task stopped");
}

/// Pump one open session until it ends
async fn pump(
    link: &mut GatewayLink,
    config: &ClientConfig,
    state: &ClientState,
    cancel: &CancellationToken,
    events: &mpsc::Sender<ViewerEvent>,
) -> PumpExit {
    let mut probe = tokio::time::interval(config.ping_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // orderly goodbye so the gateway prunes us at once
                let _ = link.close(None).await;
                return PumpExit::Cancelled;
            }

            _ = probe.tick() => {
                match ClientFrame::Ping.to_json() {
                    Ok(json) => {
                        if link.send(Message::Text(json.into())).await.is_err() {
                            warn!("gateway link lost");
                            return PumpExit::LinkLost;
                        }
                    }
                    Err(error) => warn!(%error, "ping frame could not be serialized"),
                }
            }

            inbound = link.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => match ServerFrame::from_json(&text) {
                        Ok(frame) => {
                            if let Some(event) = translate(frame) {
                                if !deliver(events, event).await {
                                    return PumpExit::ConsumerGone;
                                }
                            }
                        }
                        Err(error) => {
                            // bad frame, the link stays up
                            state.record_error(&error);
                            debug!(%error, "dropping unparseable gateway frame");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("gateway closed the link");
                        return PumpExit::LinkLost;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        state.record_error(&error);
                        warn!(%error, "gateway link lost");
                        return PumpExit::LinkLost;
                    }
                }
            }
        }
    }
}

/// Map a server frame to the event the consumer sees
fn translate(frame: ServerFrame) -> Option<ViewerEvent> {
    match frame {
        ServerFrame::Connection { clients, .. } => Some(ViewerEvent::Welcome { clients }),
        ServerFrame::RopData { data, .. } => Some(ViewerEvent::Sample(data)),
        ServerFrame::Pong { .. } => {
            trace!("pong received");
            None
        }
    }
}

/// Hand an event to the consumer, reporting whether it is still there
async fn deliver(events: &mpsc::Sender<ViewerEvent>, event: ViewerEvent) -> bool {
    events.send(event).await.is_ok()
}

/// Sleep for `delay`, returning false if cancelled first
async fn sleep_unless_cancelled(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
