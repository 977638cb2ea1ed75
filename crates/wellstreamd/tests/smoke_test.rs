//! Smoke tests for the wellstream pipeline
//!
//! These tests verify end-to-end functionality by pushing raw broker
//! payloads through the intake and watching them come out of a live
//! gateway through real viewer clients, with persistence running
//! alongside where the scenario calls for it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use wellstream_bus::SampleBus;
use wellstream_client::{ClientConfig, ViewerClient, ViewerEvent};
use wellstream_gateway::{Gateway, GatewayConfig};
use wellstream_ingest::SampleIntake;
use wellstream_protocol::TelemetrySample;
use wellstream_store::{MemoryStore, StoreWriter};

/// A broker payload as it arrives on the telemetry topic
const RAW_SAMPLE: &[u8] = br#"{"depth": 100.5, "time": "2024-06-01T10:00:00Z", "rop": 15.2}"#;

/// The sample `RAW_SAMPLE` decodes to
fn expected_sample() -> TelemetrySample {
    TelemetrySample::new(100.5, "2024-06-01T10:00:00Z", 15.2)
}

/// Bind a gateway on an ephemeral loopback port
async fn start_gateway(bus: Arc<SampleBus>) -> Gateway {
    let config = GatewayConfig {
        address: "127.0.0.1".to_string(),
        port: 0,
        max_connections: 8,
        ping_interval: Duration::from_secs(30),
    };
    Gateway::bind(config, bus)
        .await
        .expect("failed to bind gateway")
}

/// Open a viewer against `gateway` with a short reconnect delay
fn open_viewer(gateway: &Gateway) -> (ViewerClient, mpsc::Receiver<ViewerEvent>) {
    ViewerClient::open(ClientConfig {
        url: format!("ws://{}/", gateway.local_addr()),
        reconnect_delay: Duration::from_millis(25),
        ping_interval: Duration::from_secs(30),
    })
}

/// Wait for the next viewer event
async fn next_event(events: &mut mpsc::Receiver<ViewerEvent>) -> ViewerEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timeout waiting for viewer event")
        .expect("viewer event stream ended")
}

/// Drain the connect handshake and return the advertised viewer count
async fn drain_handshake(events: &mut mpsc::Receiver<ViewerEvent>) -> usize {
    assert_eq!(next_event(events).await, ViewerEvent::Connected);
    match next_event(events).await {
        ViewerEvent::Welcome { clients } => clients,
        other => panic!("expected a welcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_broker_payload_reaches_every_viewer_and_the_store() {
    // Assemble the pipeline the way serve does: store, bus, intake, gateway
    let bus = Arc::new(SampleBus::new());
    let store = Arc::new(MemoryStore::new());
    let writer = StoreWriter::spawn(store.clone(), 64);
    let intake = SampleIntake::new(Arc::clone(&bus), Some(writer.queue()));
    let gateway = start_gateway(Arc::clone(&bus)).await;

    // Two dashboards watching the same well
    let (first, mut first_events) = open_viewer(&gateway);
    assert_eq!(drain_handshake(&mut first_events).await, 1);
    let (second, mut second_events) = open_viewer(&gateway);
    assert_eq!(drain_handshake(&mut second_events).await, 2);

    // One payload arrives from the broker
    intake.handle_payload(RAW_SAMPLE);

    assert_eq!(
        next_event(&mut first_events).await,
        ViewerEvent::Sample(expected_sample())
    );
    assert_eq!(
        next_event(&mut second_events).await,
        ViewerEvent::Sample(expected_sample())
    );

    // Tear down in serve order, then check the store kept exactly one row
    first.close().await;
    second.close().await;
    gateway.close().await;
    drop(intake);
    writer.close().await;
    assert_eq!(store.rows(), vec![expected_sample()]);
}

#[tokio::test]
async fn test_duplicate_payloads_broadcast_but_persist_once() {
    let bus = Arc::new(SampleBus::new());
    let store = Arc::new(MemoryStore::new());
    let writer = StoreWriter::spawn(store.clone(), 64);
    let intake = SampleIntake::new(Arc::clone(&bus), Some(writer.queue()));
    let gateway = start_gateway(Arc::clone(&bus)).await;

    let (viewer, mut events) = open_viewer(&gateway);
    drain_handshake(&mut events).await;

    // The broker replays the same reading; live viewers see it twice
    intake.handle_payload(RAW_SAMPLE);
    intake.handle_payload(RAW_SAMPLE);

    assert_eq!(
        next_event(&mut events).await,
        ViewerEvent::Sample(expected_sample())
    );
    assert_eq!(
        next_event(&mut events).await,
        ViewerEvent::Sample(expected_sample())
    );

    // The store keyed on (depth, time) absorbed the replay
    viewer.close().await;
    gateway.close().await;
    drop(intake);
    writer.close().await;
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_invalid_payloads_never_reach_viewers() {
    let bus = Arc::new(SampleBus::new());
    let intake = SampleIntake::new(Arc::clone(&bus), None);
    let gateway = start_gateway(Arc::clone(&bus)).await;

    let (viewer, mut events) = open_viewer(&gateway);
    drain_handshake(&mut events).await;

    // Truncated JSON, a sample missing its rate, then a good one
    intake.handle_payload(b"{\"depth\": 12.0, \"time");
    intake.handle_payload(br#"{"depth": 12.0, "time": "2024-06-01T10:00:00Z"}"#);
    intake.handle_payload(RAW_SAMPLE);

    // Only the valid sample comes out the other end
    assert_eq!(
        next_event(&mut events).await,
        ViewerEvent::Sample(expected_sample())
    );

    let stats = intake.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.rejected, 2);
    assert_eq!(stats.published, 1);

    viewer.close().await;
    gateway.close().await;
}

#[tokio::test]
async fn test_gateway_shutdown_disconnects_viewers() {
    let bus = Arc::new(SampleBus::new());
    let gateway = start_gateway(Arc::clone(&bus)).await;

    let (viewer, mut events) = open_viewer(&gateway);
    drain_handshake(&mut events).await;
    assert_eq!(gateway.connection_count(), 1);

    // Closing the gateway unsubscribes every connection and drops the links
    gateway.close().await;
    assert_eq!(bus.subscriber_count(), 0);
    assert_eq!(next_event(&mut events).await, ViewerEvent::Disconnected);

    // The viewer keeps trying to come back; close cancels that retry loop
    timeout(Duration::from_secs(1), viewer.close())
        .await
        .expect("viewer close should not wait out the reconnect delay");
    assert!(events.recv().await.is_none());
}
