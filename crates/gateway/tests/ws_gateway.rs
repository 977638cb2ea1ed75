//! End-to-end gateway tests over real WebSocket connections
//!
//! Every test binds an ephemeral port, connects with tokio-tungstenite and
//! drives the protocol the way a dashboard would.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use wellstream_bus::SampleBus;
use wellstream_gateway::{Gateway, GatewayConfig};
use wellstream_protocol::TelemetrySample;

type Viewer = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_gateway(max_connections: usize) -> (Gateway, Arc<SampleBus>, String) {
    let bus = Arc::new(SampleBus::new());
    let config = GatewayConfig {
        address: "127.0.0.1".into(),
        port: 0,
        max_connections,
        ping_interval: Duration::from_secs(30),
    };
    let gateway = Gateway::bind(config, Arc::clone(&bus))
        .await
        .expect("bind gateway");
    let url = format!("ws://{}/", gateway.local_addr());
    (gateway, bus, url)
}

async fn connect(url: &str) -> Viewer {
    let (viewer, _response) = connect_async(url).await.expect("connect viewer");
    viewer
}

/// Next JSON text frame, skipping transport-level control frames
async fn next_frame(viewer: &mut Viewer) -> Value {
    loop {
        let message = timeout(Duration::from_secs(2), viewer.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("transport error");
        match message {
            Message::Text(text) => return serde_json::from_str(&text).expect("frame is json"),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn wait_for_connections(gateway: &Gateway, want: usize) {
    for _ in 0..100 {
        if gateway.connection_count() == want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "gateway stuck at {} connections, wanted {}",
        gateway.connection_count(),
        want
    );
}

fn sample(depth: f64) -> Arc<TelemetrySample> {
    Arc::new(TelemetrySample::new(depth, "2024-06-01T10:00:00Z", 15.2))
}

#[tokio::test]
async fn test_welcome_counts_registered_viewers() {
    let (gateway, _bus, url) = start_gateway(8).await;

    let mut first = connect(&url).await;
    let welcome = next_frame(&mut first).await;
    assert_eq!(welcome["type"], "connection");
    assert_eq!(welcome["clients"], 1);
    assert!(welcome["message"].is_string());
    assert!(welcome["timestamp"].is_string());

    let mut second = connect(&url).await;
    let welcome = next_frame(&mut second).await;
    assert_eq!(welcome["clients"], 2);

    gateway.close().await;
}

#[tokio::test]
async fn test_every_viewer_receives_every_sample() {
    let (gateway, bus, url) = start_gateway(8).await;

    let mut first = connect(&url).await;
    next_frame(&mut first).await;
    let mut second = connect(&url).await;
    next_frame(&mut second).await;
    wait_for_connections(&gateway, 2).await;

    assert_eq!(bus.publish(sample(100.5)), 2);

    for viewer in [&mut first, &mut second] {
        let frame = next_frame(viewer).await;
        assert_eq!(frame["type"], "rop_data");
        assert_eq!(frame["data"]["depth"], 100.5);
        assert_eq!(frame["data"]["rop"], 15.2);
        assert_eq!(frame["data"]["time"], "2024-06-01T10:00:00Z");
        assert!(frame["timestamp"].is_string());
    }

    gateway.close().await;
}

#[tokio::test]
async fn test_samples_arrive_in_publish_order() {
    let (gateway, bus, url) = start_gateway(8).await;

    let mut viewer = connect(&url).await;
    next_frame(&mut viewer).await;
    wait_for_connections(&gateway, 1).await;

    for depth in [100.0, 100.5, 101.0, 101.5] {
        bus.publish(sample(depth));
    }
    for depth in [100.0, 100.5, 101.0, 101.5] {
        let frame = next_frame(&mut viewer).await;
        assert_eq!(frame["data"]["depth"], depth);
    }

    gateway.close().await;
}

#[tokio::test]
async fn test_ping_is_answered_with_pong() {
    let (gateway, _bus, url) = start_gateway(8).await;

    let mut viewer = connect(&url).await;
    next_frame(&mut viewer).await;

    viewer
        .send(Message::Text(r#"{"type":"ping"}"#.into()))
        .await
        .expect("send ping");

    let frame = next_frame(&mut viewer).await;
    assert_eq!(frame["type"], "pong");
    assert!(frame["timestamp"].is_string());

    gateway.close().await;
}

#[tokio::test]
async fn test_unknown_inbound_payloads_are_ignored() {
    let (gateway, bus, url) = start_gateway(8).await;

    let mut viewer = connect(&url).await;
    next_frame(&mut viewer).await;
    wait_for_connections(&gateway, 1).await;

    viewer
        .send(Message::Text("not json at all".into()))
        .await
        .expect("send garbage");
    viewer
        .send(Message::Text(r#"{"type":"subscribe","topic":"x"}"#.into()))
        .await
        .expect("send unknown frame");

    // the connection must survive and keep receiving data
    bus.publish(sample(42.0));
    let frame = next_frame(&mut viewer).await;
    assert_eq!(frame["type"], "rop_data");
    assert_eq!(frame["data"]["depth"], 42.0);

    gateway.close().await;
}

#[tokio::test]
async fn test_departed_viewer_is_pruned() {
    let (gateway, bus, url) = start_gateway(8).await;

    let mut staying = connect(&url).await;
    next_frame(&mut staying).await;
    let mut leaving = connect(&url).await;
    next_frame(&mut leaving).await;
    wait_for_connections(&gateway, 2).await;

    leaving.close(None).await.expect("close viewer");
    drop(leaving);
    wait_for_connections(&gateway, 1).await;
    assert_eq!(bus.subscriber_count(), 1);

    // the survivor is unaffected
    bus.publish(sample(7.5));
    let frame = next_frame(&mut staying).await;
    assert_eq!(frame["data"]["depth"], 7.5);

    gateway.close().await;
}

#[tokio::test]
async fn test_full_gateway_refuses_the_next_handshake() {
    let (gateway, _bus, url) = start_gateway(1).await;

    let mut admitted = connect(&url).await;
    next_frame(&mut admitted).await;
    wait_for_connections(&gateway, 1).await;

    let refused = connect_async(&url).await;
    assert!(refused.is_err(), "second viewer should be refused");
    assert_eq!(gateway.stats().refused, 1);

    gateway.close().await;
}

#[tokio::test]
async fn test_close_tears_down_viewers_and_stops_listening() {
    let (gateway, bus, url) = start_gateway(8).await;

    let mut viewer = connect(&url).await;
    next_frame(&mut viewer).await;
    wait_for_connections(&gateway, 1).await;

    gateway.close().await;
    assert_eq!(bus.subscriber_count(), 0);

    // the viewer sees an orderly close, not a reset
    let mut saw_close = false;
    while let Ok(Some(message)) = timeout(Duration::from_secs(2), viewer.next()).await {
        match message {
            Ok(Message::Close(_)) => {
                saw_close = true;
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    assert!(saw_close, "expected a close frame");

    // nobody is listening any more
    assert!(connect_async(&url).await.is_err());
}
