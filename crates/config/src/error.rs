//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Why a configuration failed to load or validate
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML or a field has the wrong type
    #[error("malformed configuration: {0}")]
    Malformed(#[from] toml::de::Error),

    /// A well-typed field holds an unusable value
    #[error("[{section}] has invalid {field}: {message}")]
    InvalidValue {
        section: &'static str,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_names_section_and_field() {
        let err = ConfigError::invalid_value("broker", "port", "must not be zero");
        let text = err.to_string();
        assert!(text.contains("[broker]"));
        assert!(text.contains("port"));
        assert!(text.contains("must not be zero"));
    }
}
