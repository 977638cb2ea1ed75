//! Persistence configuration
//!
//! Sample storage is opt-in; the stream keeps flowing whether or not it is
//! enabled or healthy.

use serde::Deserialize;

/// Sample persistence configuration
///
/// # Example
///
/// ```toml
/// [store]
/// enabled = true
/// max_rows = 50000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Whether inbound samples are persisted at all
    /// Default: false
    pub enabled: bool,

    /// Write queue capacity between ingestion and the store; overflow drops
    /// the write, never the broadcast
    /// Default: 1024
    pub queue_size: usize,

    /// Row cap for the built-in in-memory store, oldest evicted first
    /// Default: 100000
    pub max_rows: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_size: 1024,
            max_rows: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.queue_size, 1024);
        assert_eq!(config.max_rows, 100_000);
    }

    #[test]
    fn test_enable() {
        let config: StoreConfig = toml::from_str("enabled = true").unwrap();
        assert!(config.enabled);
        assert_eq!(config.queue_size, 1024);
    }
}
