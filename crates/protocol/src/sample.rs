//! Telemetry sample types and validation
//!
//! `validate` is the single gate between raw broker payloads and the typed
//! pipeline. It checks field presence and numeric parseability and nothing
//! else; anything it accepts is safe to persist and to broadcast verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Longest rejected-value excerpt carried in an error
const VALUE_EXCERPT_LEN: usize = 32;

/// Timestamp carried by a sample, kept exactly as the producer sent it
///
/// Rig-floor producers are split between textual timestamps (usually
/// RFC 3339) and integer epochs; both travel through the pipeline untouched
/// and are compared byte-for-byte when deduplicating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleTime {
    /// Integer epoch, unit defined by the producer
    Epoch(i64),
    /// Textual timestamp
    Text(String),
}

impl fmt::Display for SampleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epoch(epoch) => write!(f, "{epoch}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for SampleTime {
    fn from(epoch: i64) -> Self {
        Self::Epoch(epoch)
    }
}

impl From<&str> for SampleTime {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for SampleTime {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A validated rate-of-penetration sample
///
/// # Example
///
/// ```
/// use wellstream_protocol::TelemetrySample;
///
/// let sample = TelemetrySample::new(100.5, "2024-06-01T10:00:00Z", 15.2);
/// assert_eq!(sample.depth, 100.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Bit depth in meters
    pub depth: f64,
    /// Producer timestamp, opaque to the pipeline
    pub time: SampleTime,
    /// Rate of penetration in meters per hour
    pub rop: f64,
}

impl TelemetrySample {
    /// Create a sample from already-validated parts
    #[inline]
    pub fn new(depth: f64, time: impl Into<SampleTime>, rop: f64) -> Self {
        Self {
            depth,
            time: time.into(),
            rop,
        }
    }
}

/// Validate a decoded broker payload into a `TelemetrySample`
///
/// Accepts a JSON object whose `depth`, `time` and `rop` fields are all
/// present and non-null. `depth` and `rop` may be JSON numbers or strings
/// that parse as finite floats in full (no prefix parsing, so `"12.5abc"`
/// is rejected, and so is `depth: 0` being treated as absent). `time` may
/// be a non-empty string or an integer epoch. Extra fields are ignored.
pub fn validate(raw: &Value) -> Result<TelemetrySample, ValidationError> {
    let fields = raw.as_object().ok_or(ValidationError::NotAnObject)?;
    let depth = numeric_field(fields, "depth")?;
    let time = time_field(fields)?;
    let rop = numeric_field(fields, "rop")?;
    Ok(TelemetrySample { depth, time, rop })
}

fn numeric_field(fields: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    let value = required(fields, field)?;
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(ValidationError::NotNumeric {
            field,
            value: excerpt(value),
        }),
    }
}

fn time_field(fields: &Map<String, Value>) -> Result<SampleTime, ValidationError> {
    let value = required(fields, "time")?;
    match value {
        Value::String(text) if !text.is_empty() => Ok(SampleTime::Text(text.clone())),
        Value::Number(number) => number
            .as_i64()
            .map(SampleTime::Epoch)
            .ok_or_else(|| ValidationError::BadTimestamp {
                value: excerpt(value),
            }),
        _ => Err(ValidationError::BadTimestamp {
            value: excerpt(value),
        }),
    }
}

fn required<'v>(
    fields: &'v Map<String, Value>,
    field: &'static str,
) -> Result<&'v Value, ValidationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

/// Short rendering of a rejected value for error messages and logs
fn excerpt(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.len() <= VALUE_EXCERPT_LEN {
        return rendered;
    }
    // back off to a char boundary before cutting
    let mut cut = VALUE_EXCERPT_LEN;
    while !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &rendered[..cut])
}
