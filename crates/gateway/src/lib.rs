//! Real-time gateway for wellstream
//!
//! Serves the downstream edge of the pipeline: viewers connect over
//! WebSocket, get a welcome frame, and from then on receive every sample
//! the bus publishes until they disconnect or the gateway closes.
//!
//! # Protocol
//!
//! All frames are JSON text messages:
//!
//! - on connect, server sends `{"type": "connection", "clients": N, ...}`
//! - samples arrive as `{"type": "rop_data", "data": {...}, "timestamp": ...}`
//! - a client `{"type": "ping"}` is answered with `{"type": "pong", ...}`
//! - other inbound payloads are accepted and ignored
//!
//! `GET /healthz` reports liveness, the current connection count, and the
//! fan-out counters.
//!
//! # Design Principles
//!
//! - **One bus subscription per connection**: each accepted socket runs its
//!   own pump task with its own queue; a slow viewer loses its own frames
//!   and never stalls ingestion or other viewers
//! - **Failed send means dead connection**: no retry and no buffering, the
//!   connection is pruned and its subscription removed at once
//! - **Ordered teardown**: unsubscribe, then close the transport, then drop
//!   the membership entry, for single connections and for `close()`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wellstream_bus::SampleBus;
//! use wellstream_gateway::{Gateway, GatewayConfig};
//!
//! let bus = Arc::new(SampleBus::new());
//! let gateway = Gateway::bind(GatewayConfig::default(), Arc::clone(&bus)).await?;
//! // samples published to the bus now reach every connected viewer
//! gateway.close().await;
//! ```

mod error;
mod registry;
mod server;

pub use error::GatewayError;
pub use server::{Gateway, GatewayConfig, GatewayStats};
