//! Logging configuration
//!
//! The `[log]` section sets the baseline verbosity for wellstreamd. A
//! `RUST_LOG` environment filter still wins when set.

use std::fmt;

use serde::Deserialize;

/// Baseline verbosity, lowest to highest severity
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The level as a tracing filter directive
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `[log]` section
///
/// ```toml
/// [log]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Baseline log level (trace, debug, info, warn, error)
    /// Default: info
    pub level: LogLevel,
}
