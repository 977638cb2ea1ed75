//! Wellstream Bus - in-process fan-out from ingestion to live consumers
//!
//! This crate provides the subscription registry between the broker link and
//! everything that watches samples (gateway connections, embedded tooling).
//! It implements a broadcast point that:
//!
//! - Hands each consumer its own bounded queue (no callbacks, no re-entrancy)
//! - Isolates consumers from each other: a full queue drops samples for that
//!   consumer only, and the consumer stays registered
//! - Sweeps consumers whose receiver is gone
//! - Has near-zero cost when no consumers are registered
//!
//! # Architecture
//!
//! ```text
//! BrokerConnector.publish()
//!     │
//!     ├──→ Arc::new(sample)
//!     │         │
//!     │    SampleBus ◄── membership (RwLock), empty fast path (AtomicBool)
//!     │         │
//!     │         ▼
//!     │    per-consumer mpsc queues
//!     │         │
//!     │         ▼
//!     └──→ gateway connection pumps / watch command
//! ```

mod sample_bus;
mod subscriber;

pub use sample_bus::{BusStats, SampleBus};
pub use subscriber::SubscriberHandle;
