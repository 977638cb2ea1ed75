//! Broker link configuration
//!
//! Settings for the upstream MQTT link the ingestion connector maintains.

use serde::Deserialize;
use std::time::Duration;

/// Upstream broker configuration
///
/// # Example
///
/// ```toml
/// [broker]
/// host = "plc-gw-01"
/// topic = "rig7/drilling/rop"
/// reconnect_delay = "3s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Whether the upstream link is brought up at all
    /// Default: true
    pub enabled: bool,

    /// Broker hostname or IP
    /// Default: "localhost"
    pub host: String,

    /// Broker port
    /// Default: 1883
    pub port: u16,

    /// Topic carrying telemetry samples
    /// Default: "plc/drilling/rop"
    pub topic: String,

    /// Topic used by outbound test publishes
    /// Default: "plc/drilling/test"
    pub publish_topic: String,

    /// Fixed client id; when unset a unique one is generated per process
    /// Default: unset
    pub client_id: Option<String>,

    /// MQTT keep-alive interval, at least 5 seconds
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub keepalive: Duration,

    /// Start each session clean instead of resuming broker-side state
    /// Default: true
    pub clean_session: bool,

    /// How long connect() waits for the subscription to be acknowledged
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Fixed pause between reconnect attempts (no backoff growth)
    /// Default: 3s
    #[serde(with = "humantime_serde")]
    pub reconnect_delay: Duration,

    /// Consecutive failed attempts before the link gives up for good
    /// Default: 10
    pub max_reconnect_attempts: u32,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".into(),
            port: 1883,
            topic: "plc/drilling/rop".into(),
            publish_topic: "plc/drilling/test".into(),
            client_id: None,
            keepalive: Duration::from_secs(60),
            clean_session: true,
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_attempts: 10,
        }
    }
}
