//! Reconnecting viewer client
//!
//! Keeps a WebSocket link to a wellstream gateway alive from the viewer side
//! and turns its frames into typed events on a channel. The link is
//! self-healing: every drop schedules another connect after a fixed delay,
//! forever, until the handle is closed.
//!
//! # Design Principles
//!
//! - **The consumer never sees the transport**: application code reads
//!   `ViewerEvent`s; connects, drops, and retries stay inside the client
//! - **Reconnect never gives up**: unlike the upstream broker link there is
//!   no attempt budget on the viewer edge, only `close()` stops it
//! - **Bad frames are dropped, not fatal**: a payload that fails to parse
//!   sets `last_error` and the link stays open
//!
//! # Example
//!
//! ```ignore
//! use wellstream_client::{ClientConfig, ViewerClient, ViewerEvent};
//!
//! let (client, mut events) = ViewerClient::open(ClientConfig {
//!     url: "ws://gateway.local:8081/".into(),
//!     ..Default::default()
//! });
//!
//! while let Some(event) = events.recv().await {
//!     if let ViewerEvent::Sample(sample) = event {
//!         println!("depth {:.1} rop {:.1}", sample.depth, sample.rop);
//!     }
//! }
//!
//! client.close().await;
//! ```

mod state;
mod viewer;

pub use state::{ClientPhase, ClientStatus};
pub use viewer::{ClientConfig, ViewerClient, ViewerEvent};
