//! Ingestion errors

use std::time::Duration;

/// Errors surfaced by the broker link
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The subscription was not acknowledged within the connect timeout
    #[error("broker connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The link task gave up before the subscription was acknowledged
    #[error("broker link failed before the subscription was acknowledged")]
    LinkFailed,

    /// A request could not be queued to the broker client
    #[error("broker request failed: {0}")]
    Request(#[from] rumqttc::ClientError),

    /// An outbound payload could not be serialized
    #[error("payload could not be serialized: {0}")]
    Encode(#[from] serde_json::Error),
}
