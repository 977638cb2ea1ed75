//! Gateway errors

/// Errors surfaced while bringing the gateway up
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The listen address could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}
