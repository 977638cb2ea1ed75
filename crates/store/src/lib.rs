//! Wellstream Store - the sample persistence boundary
//!
//! Persistence sits strictly off the broadcast path: ingestion queues
//! samples into a `StoreWriter` and moves on, and every store outcome
//! (inserted, duplicate, error) is absorbed and counted by the writer's
//! drain task. A broken store can never stall or fail the live stream.
//!
//! `SampleStore` is the integration seam. The built-in `MemoryStore` backs
//! development rigs and tests; durable backends (Postgres, Timescale, ...)
//! live in downstream crates behind the same upsert contract.

mod error;
mod memory;
mod writer;

use async_trait::async_trait;

use wellstream_protocol::TelemetrySample;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use writer::{StoreQueue, StoreWriter, WriterStats};

/// Result of an upsert against the `(depth, time)` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The sample became a new row
    Inserted,
    /// The key already existed; the stored row is untouched
    Duplicate,
}

/// A sample store keyed on `(depth, time)`
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Insert a sample, or report `Duplicate` when its key is already
    /// present
    ///
    /// Duplicates leave the previously stored row exactly as it was, the
    /// insert-or-ignore contract relational backends express with
    /// `ON CONFLICT DO NOTHING`.
    async fn upsert(&self, sample: &TelemetrySample) -> Result<UpsertOutcome, StoreError>;
}
