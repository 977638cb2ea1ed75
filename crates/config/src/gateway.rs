//! Gateway configuration
//!
//! Settings for the downstream WebSocket server viewers connect to.

use serde::Deserialize;
use std::time::Duration;

/// Viewer gateway configuration
///
/// # Example
///
/// ```toml
/// [gateway]
/// address = "0.0.0.0"
/// port = 8081
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 8081
    pub port: u16,

    /// Hard cap on simultaneous viewer connections; upgrades past it are
    /// refused
    /// Default: 100
    pub max_connections: usize,

    /// Per-connection sample queue capacity; a viewer that falls this far
    /// behind starts losing samples
    /// Default: 256
    pub sample_queue: usize,

    /// Protocol-level ping cadence used to detect dead transports
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 8081,
            max_connections: 100,
            sample_queue: 256,
            ping_interval: Duration::from_secs(30),
        }
    }
}
