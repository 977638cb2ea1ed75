//! Store error types

use thiserror::Error;

/// Errors a `SampleStore` backend can report
///
/// The writer logs and counts these; they never reach the broadcast path.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Backend cannot be reached at all
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected or failed the write
    #[error("store write failed: {0}")]
    WriteFailed(String),
}
