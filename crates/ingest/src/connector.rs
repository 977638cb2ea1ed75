//! MQTT link lifecycle
//!
//! A `BrokerConnector` owns one upstream link: it dials the broker,
//! subscribes to the sample topic, and feeds every inbound publish to the
//! intake. Link failures after the first acknowledged subscribe are healed
//! with a fixed-delay reconnect; the budget is a bounded number of
//! consecutive attempts, after which the link stops for good and the rest
//! of the process keeps running without new samples.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS,
    SubscribeReasonCode,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use wellstream_protocol::TelemetrySample;

use crate::error::IngestError;
use crate::intake::{IntakeStats, SampleIntake};
use crate::state::{LinkPhase, LinkState, LinkStatus};

/// Capacity of the outbound request queue (subscribe, publish, disconnect)
const REQUEST_QUEUE_CAPACITY: usize = 10;

/// Upstream link configuration
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Broker host name or address
    pub host: String,

    /// Broker port
    pub port: u16,

    /// Topic carrying telemetry samples
    pub topic: String,

    /// Topic for outbound test publishes
    pub publish_topic: String,

    /// MQTT client identifier
    pub client_id: String,

    /// Keep-alive interval, at least 5 seconds
    pub keepalive: Duration,

    /// Ask the broker to drop session state between connects
    pub clean_session: bool,

    /// How long `connect` waits for the subscription acknowledgment
    pub connect_timeout: Duration,

    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,

    /// Consecutive failed attempts before the link gives up for good
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            topic: "plc/drilling/rop".into(),
            publish_topic: "plc/drilling/test".into(),
            client_id: "wellstream-ingest".into(),
            keepalive: Duration::from_secs(60),
            clean_session: true,
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_attempts: 10,
        }
    }
}

/// Handle to a live upstream link
///
/// Returned by [`BrokerConnector::connect`] once the subscription is
/// acknowledged. From then on the link heals itself within its reconnect
/// budget until `disconnect` is called or the budget runs out.
pub struct BrokerConnector {
    config: ConnectorConfig,
    client: AsyncClient,
    state: Arc<LinkState>,
    intake: SampleIntake,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl BrokerConnector {
    /// Dial the broker and wait until the sample subscription is live
    ///
    /// Resolves once the broker acknowledges the subscription, or fails
    /// after `config.connect_timeout`. On failure the link is torn down;
    /// nothing keeps retrying in the background.
    pub async fn connect(
        config: ConnectorConfig,
        intake: SampleIntake,
    ) -> Result<Self, IngestError> {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keepalive);
        options.set_clean_session(config.clean_session);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        let state = Arc::new(LinkState::new(&config.topic));
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        state.transition(LinkPhase::Connecting);
        info!(
            host = %config.host,
            port = config.port,
            topic = %config.topic,
            client_id = %config.client_id,
            "connecting to broker"
        );

        let task = tokio::spawn(run_link(
            eventloop,
            client.clone(),
            config.clone(),
            Arc::clone(&state),
            intake.clone(),
            cancel.clone(),
            ready_tx,
        ));

        match timeout(config.connect_timeout, ready_rx).await {
            Ok(Ok(())) => Ok(Self {
                config,
                client,
                state,
                intake,
                cancel,
                task,
            }),
            Ok(Err(_)) => {
                // task stopped before the subscription was acknowledged
                let _ = task.await;
                Err(IngestError::LinkFailed)
            }
            Err(_) => {
                cancel.cancel();
                let _ = task.await;
                Err(IngestError::ConnectTimeout(config.connect_timeout))
            }
        }
    }

    /// Current link snapshot
    pub fn status(&self) -> LinkStatus {
        self.state.status()
    }

    /// Whether the subscription is currently live
    pub fn is_active(&self) -> bool {
        self.state.phase() == LinkPhase::Active
    }

    /// Intake counters for this link
    pub fn intake_stats(&self) -> IntakeStats {
        self.intake.stats()
    }

    /// Publish a diagnostic sample to the test topic
    ///
    /// Ordering relative to inbound consumption is not guaranteed.
    pub async fn publish_test(&self, sample: &TelemetrySample) -> Result<(), IngestError> {
        let payload = serde_json::to_vec(sample)?;
        self.client
            .publish(
                &self.config.publish_topic,
                QoS::AtLeastOnce,
                false,
                payload,
            )
            .await?;
        debug!(topic = %self.config.publish_topic, "test sample published");
        Ok(())
    }

    /// Tear the link down and wait for the task to stop
    pub async fn disconnect(self) {
        // best effort: queue the MQTT disconnect before stopping the loop
        let _ = self.client.try_disconnect();
        self.cancel.cancel();
        if let Err(error) = self.task.await {
            warn!(%error, "broker link task panicked");
        }
        self.state.transition(LinkPhase::Disconnected);
        info!("broker link closed");
    }
}

/// Drive the MQTT event loop for the life of the link
async fn run_link(
    mut eventloop: EventLoop,
    client: AsyncClient,
    config: ConnectorConfig,
    state: Arc<LinkState>,
    intake: SampleIntake,
    cancel: CancellationToken,
    ready: oneshot::Sender<()>,
) {
    let mut ready = Some(ready);

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    warn!(code = ?ack.code, "broker refused connection");
                    if !recover(&state, &config, &cancel).await {
                        break;
                    }
                    continue;
                }
                state.transition(LinkPhase::Subscribing);
                debug!(topic = %config.topic, "broker connected, subscribing");
                if let Err(error) = client.subscribe(&config.topic, QoS::AtLeastOnce).await {
                    warn!(%error, "subscribe request failed");
                    if !recover(&state, &config, &cancel).await {
                        break;
                    }
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                if ack
                    .return_codes
                    .iter()
                    .any(|code| *code == SubscribeReasonCode::Failure)
                {
                    warn!(topic = %config.topic, "broker rejected subscription");
                    if !recover(&state, &config, &cancel).await {
                        break;
                    }
                    continue;
                }
                state.transition(LinkPhase::Active);
                state.reset_attempts();
                info!(topic = %config.topic, "broker subscription active");
                if let Some(ready) = ready.take() {
                    let _ = ready.send(());
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                intake.handle_payload(&publish.payload);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                warn!("broker closed the session");
                if !recover(&state, &config, &cancel).await {
                    break;
                }
            }
            Ok(Event::Incoming(packet)) => {
                trace!(?packet, "broker packet");
            }
            Ok(Event::Outgoing(_)) => {}
            Err(error) => {
                if state.phase() == LinkPhase::Connecting {
                    debug!(%error, "broker not reachable yet");
                } else {
                    warn!(%error, "broker link lost");
                }
                if !recover(&state, &config, &cancel).await {
                    break;
                }
            }
        }
    }

    state.transition(LinkPhase::Disconnected);
    debug!("broker link task stopped");
}

/// Decide how to continue after a link failure
///
/// Inside the initial connect window the task keeps dialing quietly (the
/// caller's connect timeout bounds it); afterwards every failure counts
/// against the reconnect budget. Returns false when the loop must stop.
async fn recover(state: &LinkState, config: &ConnectorConfig, cancel: &CancellationToken) -> bool {
    if state.phase() == LinkPhase::Connecting {
        sleep_unless_cancelled(cancel, config.reconnect_delay).await
    } else {
        schedule_reconnect(state, config, cancel).await
    }
}

/// Wait out the reconnect delay, counting the attempt against the budget
///
/// Returns false when the budget is exhausted or the link was cancelled.
pub(crate) async fn schedule_reconnect(
    state: &LinkState,
    config: &ConnectorConfig,
    cancel: &CancellationToken,
) -> bool {
    state.transition(LinkPhase::Reconnecting);
    if state.attempts() >= config.max_reconnect_attempts {
        error!(
            attempts = state.attempts(),
            "reconnect budget exhausted, giving up on the broker link"
        );
        return false;
    }
    let attempt = state.record_attempt();
    info!(
        attempt,
        max = config.max_reconnect_attempts,
        delay_ms = config.reconnect_delay.as_millis() as u64,
        "scheduling broker reconnect"
    );
    sleep_unless_cancelled(cancel, config.reconnect_delay).await
}

/// Sleep for `delay`, returning false if cancelled first
pub(crate) async fn sleep_unless_cancelled(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
