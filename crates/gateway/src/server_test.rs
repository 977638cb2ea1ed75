use super::*;

fn test_config() -> GatewayConfig {
    GatewayConfig {
        address: "127.0.0.1".into(),
        port: 0,
        max_connections: 4,
        ping_interval: Duration::from_secs(30),
    }
}

fn test_shared() -> Arc<GatewayShared> {
    Arc::new(GatewayShared {
        config: test_config(),
        bus: Arc::new(SampleBus::new()),
        registry: ConnectionRegistry::new(),
        metrics: GatewayMetrics::default(),
        accepting: AtomicBool::new(true),
    })
}

#[test]
fn test_default_config() {
    let config = GatewayConfig::default();
    assert_eq!(config.address, "0.0.0.0");
    assert_eq!(config.port, 8081);
    assert_eq!(config.max_connections, 100);
    assert_eq!(config.ping_interval, Duration::from_secs(30));
}

#[tokio::test]
async fn test_bind_picks_an_ephemeral_port() {
    let gateway = Gateway::bind(test_config(), Arc::new(SampleBus::new()))
        .await
        .unwrap();

    assert_ne!(gateway.local_addr().port(), 0);
    assert_eq!(gateway.connection_count(), 0);

    let stats = gateway.stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.total_accepted, 0);
    assert_eq!(stats.refused, 0);
    assert_eq!(stats.frames_sent, 0);
    assert_eq!(stats.send_failures, 0);

    gateway.close().await;
}

#[tokio::test]
async fn test_bind_fails_when_the_port_is_taken() {
    let first = Gateway::bind(test_config(), Arc::new(SampleBus::new()))
        .await
        .unwrap();

    let mut config = test_config();
    config.port = first.local_addr().port();
    let error = Gateway::bind(config, Arc::new(SampleBus::new()))
        .await
        .unwrap_err();
    assert!(matches!(error, GatewayError::Bind { .. }));

    first.close().await;
}

#[tokio::test]
async fn test_healthz_reports_the_client_count() {
    let shared = test_shared();
    shared
        .registry
        .register("127.0.0.1:4000".parse().unwrap(), 4)
        .unwrap();

    let Json(body) = healthz(State(shared)).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["clients"], 1);
    assert_eq!(body["stream"]["subscribers"], 0);
    assert!(body["timestamp"].is_string());
}
