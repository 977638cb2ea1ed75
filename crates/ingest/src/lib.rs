//! Broker ingestion for wellstream
//!
//! Owns the upstream MQTT link: connect, subscribe, decode, validate, and
//! hand every accepted sample to the fan-out bus (and optionally to the
//! store queue). The link heals itself with a fixed-delay reconnect and a
//! bounded retry budget; exhausting the budget is terminal for the link
//! only, never for the rest of the process.
//!
//! # Pipeline
//!
//! ```text
//! broker ──> BrokerConnector ──> SampleIntake ──┬──> StoreQueue (optional)
//!            (link lifecycle)    (decode +      │
//!                                 validate)     └──> SampleBus (always)
//! ```
//!
//! # Design Principles
//!
//! - **Explicit phases**: the link lifecycle is a small transition table
//!   (`LinkPhase`), mutated only by the link task and testable without I/O
//! - **Live data never waits**: a sample is published to the bus even when
//!   the store queue is full, failing, or disabled
//! - **Invalid payloads stop here**: decode/validation failures are counted
//!   and logged, never forwarded
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wellstream_bus::SampleBus;
//! use wellstream_ingest::{BrokerConnector, ConnectorConfig, SampleIntake};
//!
//! let bus = Arc::new(SampleBus::new());
//! let intake = SampleIntake::new(Arc::clone(&bus), None);
//!
//! let config = ConnectorConfig {
//!     host: "broker.local".into(),
//!     topic: "plc/drilling/rop".into(),
//!     ..Default::default()
//! };
//!
//! let link = BrokerConnector::connect(config, intake).await?;
//! // ... later
//! link.disconnect().await;
//! ```

mod connector;
mod error;
mod intake;
mod state;

pub use connector::{BrokerConnector, ConnectorConfig};
pub use error::IngestError;
pub use intake::{IntakeStats, SampleIntake};
pub use state::{LinkPhase, LinkState, LinkStatus};
