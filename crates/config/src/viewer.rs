//! Viewer client configuration
//!
//! Defaults for the `watch` command and any embedded viewer client.

use serde::Deserialize;
use std::time::Duration;

/// Viewer client configuration
///
/// # Example
///
/// ```toml
/// [viewer]
/// url = "ws://rig7.local:8081/"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Gateway WebSocket URL
    /// Default: "ws://127.0.0.1:8081/"
    pub url: String,

    /// Fixed pause before each reconnect attempt; retries never stop until
    /// the client is closed
    /// Default: 3s
    #[serde(with = "humantime_serde")]
    pub reconnect_delay: Duration,

    /// Application-level ping cadence, exercising the gateway pong path
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8081/".into(),
            reconnect_delay: Duration::from_secs(3),
            ping_interval: Duration::from_secs(30),
        }
    }
}
