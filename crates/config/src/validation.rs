//! Configuration validation
//!
//! Validates config consistency:
//! - Hosts, topics and URLs are non-empty and well formed
//! - Ports are non-zero
//! - Queue capacities and retry budgets are non-zero

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_broker(config)?;
    validate_gateway(config)?;
    validate_store(config)?;
    validate_viewer(config)?;
    validate_shutdown(config)?;
    Ok(())
}

fn validate_broker(config: &Config) -> Result<()> {
    let broker = &config.broker;
    if broker.host.is_empty() {
        return Err(ConfigError::invalid_value("broker", "host", "must not be empty"));
    }
    if broker.port == 0 {
        return Err(ConfigError::invalid_value("broker", "port", "must not be zero"));
    }
    if broker.topic.is_empty() {
        return Err(ConfigError::invalid_value("broker", "topic", "must not be empty"));
    }
    if broker.publish_topic.is_empty() {
        return Err(ConfigError::invalid_value(
            "broker",
            "publish_topic",
            "must not be empty",
        ));
    }
    if broker.max_reconnect_attempts == 0 {
        return Err(ConfigError::invalid_value(
            "broker",
            "max_reconnect_attempts",
            "must be at least 1",
        ));
    }
    if broker.connect_timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "broker",
            "connect_timeout",
            "must be non-zero",
        ));
    }
    // the MQTT client refuses shorter keep-alives
    if broker.keepalive < Duration::from_secs(5) {
        return Err(ConfigError::invalid_value(
            "broker",
            "keepalive",
            "must be at least 5 seconds",
        ));
    }
    Ok(())
}

fn validate_gateway(config: &Config) -> Result<()> {
    let gateway = &config.gateway;
    if gateway.address.is_empty() {
        return Err(ConfigError::invalid_value("gateway", "address", "must not be empty"));
    }
    if gateway.port == 0 {
        return Err(ConfigError::invalid_value("gateway", "port", "must not be zero"));
    }
    if gateway.max_connections == 0 {
        return Err(ConfigError::invalid_value(
            "gateway",
            "max_connections",
            "must be at least 1",
        ));
    }
    if gateway.sample_queue == 0 {
        return Err(ConfigError::invalid_value(
            "gateway",
            "sample_queue",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_store(config: &Config) -> Result<()> {
    let store = &config.store;
    if store.queue_size == 0 {
        return Err(ConfigError::invalid_value("store", "queue_size", "must be at least 1"));
    }
    if store.max_rows == 0 {
        return Err(ConfigError::invalid_value("store", "max_rows", "must be at least 1"));
    }
    Ok(())
}

fn validate_viewer(config: &Config) -> Result<()> {
    let url = &config.viewer.url;
    if !url.starts_with("ws://") && !url.starts_with("wss://") {
        return Err(ConfigError::invalid_value(
            "viewer",
            "url",
            format!("must start with ws:// or wss://, got '{url}'"),
        ));
    }
    Ok(())
}

fn validate_shutdown(config: &Config) -> Result<()> {
    if config.shutdown.timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "shutdown",
            "timeout",
            "must be non-zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn expect_invalid(toml: &str, field: &str) {
        let err = Config::from_str(toml).unwrap_err();
        assert!(
            err.to_string().contains(field),
            "expected '{field}' in: {err}"
        );
    }

    #[test]
    fn test_zero_broker_port_rejected() {
        expect_invalid("[broker]\nport = 0", "port");
    }

    #[test]
    fn test_empty_topic_rejected() {
        expect_invalid("[broker]\ntopic = \"\"", "topic");
    }

    #[test]
    fn test_zero_retry_budget_rejected() {
        expect_invalid("[broker]\nmax_reconnect_attempts = 0", "max_reconnect_attempts");
    }

    #[test]
    fn test_short_keepalive_rejected() {
        expect_invalid("[broker]\nkeepalive = \"2s\"", "keepalive");
    }

    #[test]
    fn test_zero_gateway_port_rejected() {
        expect_invalid("[gateway]\nport = 0", "port");
    }

    #[test]
    fn test_zero_sample_queue_rejected() {
        expect_invalid("[gateway]\nsample_queue = 0", "sample_queue");
    }

    #[test]
    fn test_zero_store_queue_rejected() {
        expect_invalid("[store]\nqueue_size = 0", "queue_size");
    }

    #[test]
    fn test_http_viewer_url_rejected() {
        expect_invalid("[viewer]\nurl = \"http://x/\"", "url");
    }

    #[test]
    fn test_zero_shutdown_timeout_rejected() {
        expect_invalid("[shutdown]\ntimeout = \"0s\"", "timeout");
    }

    #[test]
    fn test_valid_config_passes() {
        let toml = r#"
[broker]
host = "plc-gw-01"
topic = "rig7/drilling/rop"

[viewer]
url = "wss://rig7.local/stream"
"#;
        assert!(Config::from_str(toml).is_ok());
    }
}
