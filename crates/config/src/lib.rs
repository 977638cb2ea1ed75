//! Wellstream Configuration
//!
//! TOML file surface for the wellstream daemon. Every section carries
//! working defaults, so an empty file is a valid configuration and a real
//! one only names what it changes.
//!
//! # Parsing
//!
//! Configuration parses through the `FromStr` trait:
//!
//! ```
//! use wellstream_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[broker]\nhost = \"plc-gw-01\"").unwrap();
//! assert_eq!(config.broker.host, "plc-gw-01");
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [broker]
//! host = "plc-gw-01"
//!
//! [gateway]
//! port = 8081
//! ```
//!
//! # Example Full Config
//!
//! `configs/example.toml` lists every option with its default.

mod broker;
mod error;
mod gateway;
mod logging;
mod store;
mod validation;
mod viewer;

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub use broker::BrokerConfig;
pub use error::{ConfigError, Result};
pub use gateway::GatewayConfig;
pub use logging::{LogConfig, LogLevel};
pub use store::StoreConfig;
pub use viewer::ViewerConfig;

use serde::Deserialize;

/// Top-level configuration, one field per TOML section
///
/// Every section may be omitted; defaults are applied per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Upstream broker link (MQTT)
    pub broker: BrokerConfig,

    /// Downstream viewer gateway (WebSocket)
    pub gateway: GatewayConfig,

    /// Sample persistence
    pub store: StoreConfig,

    /// Viewer client defaults (for the `watch` command)
    pub viewer: ViewerConfig,

    /// Process shutdown behavior
    pub shutdown: ShutdownConfig,
}

impl Config {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Fails when the file is unreadable, is not valid TOML, or holds a
    /// value `validate()` rejects.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_str(&contents)
    }

    /// Validate the configuration
    ///
    /// Checks for empty hosts and topics, zero ports, zero queue capacities
    /// and malformed viewer URLs.
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    /// Parse and validate a TOML string
    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

/// Process shutdown configuration
///
/// # Example
///
/// ```toml
/// [shutdown]
/// timeout = "10s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Deadline for the ordered shutdown sequence; past it the process
    /// exits unconditionally
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.topic, "plc/drilling/rop");
        assert_eq!(config.gateway.port, 8081);
        assert!(!config.store.enabled);
        assert_eq!(config.shutdown.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_partial_config_keeps_the_other_defaults() {
        let toml = r#"
[broker]
host = "plc-gw-01"

[gateway]
port = 9090
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.broker.host, "plc-gw-01");
        assert_eq!(config.broker.port, 1883); // untouched default
        assert_eq!(config.gateway.port, 9090);
    }

    #[test]
    fn test_every_section_parses() {
        let toml = r#"
[log]
level = "debug"

[broker]
host = "broker.rig7.local"
port = 8883
topic = "rig7/drilling/rop"
publish_topic = "rig7/drilling/test"
client_id = "wellstream_rig7"
keepalive = "30s"
clean_session = false
connect_timeout = "5s"
reconnect_delay = "1s"
max_reconnect_attempts = 5

[gateway]
address = "127.0.0.1"
port = 8082
max_connections = 10
sample_queue = 64
ping_interval = "5s"

[store]
enabled = true
queue_size = 512
max_rows = 1000

[viewer]
url = "ws://rig7.local:8082/"
reconnect_delay = "1s"

[shutdown]
timeout = "3s"
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.broker.host, "broker.rig7.local");
        assert_eq!(config.broker.topic, "rig7/drilling/rop");
        assert_eq!(config.broker.client_id.as_deref(), Some("wellstream_rig7"));
        assert_eq!(config.broker.keepalive, Duration::from_secs(30));
        assert!(!config.broker.clean_session);
        assert_eq!(config.broker.max_reconnect_attempts, 5);
        assert_eq!(config.gateway.max_connections, 10);
        assert_eq!(config.gateway.ping_interval, Duration::from_secs(5));
        assert!(config.store.enabled);
        assert_eq!(config.store.max_rows, 1000);
        assert_eq!(config.viewer.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.shutdown.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let result = Config::from_str("invalid { toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_pass_validation() {
        assert!(Config::default().validate().is_ok());
    }
}
