//! Protocol error types
//!
//! Rejections produced when a raw broker payload fails validation.

use thiserror::Error;

/// Reasons a raw payload is rejected by `validate`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Payload decoded to something other than a JSON object
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A required field is absent or null
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A measurement field is present but does not parse as a finite number
    #[error("field {field} is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    /// The time field is neither a non-empty string nor an integer epoch
    #[error("field time is not a timestamp: {value}")]
    BadTimestamp { value: String },
}

impl ValidationError {
    /// The field this rejection is about, when field-scoped
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::NotAnObject => None,
            Self::MissingField(field) => Some(field),
            Self::NotNumeric { field, .. } => Some(field),
            Self::BadTimestamp { .. } => Some("time"),
        }
    }
}
