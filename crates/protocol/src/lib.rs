//! Wellstream Protocol - Sample validation and gateway wire frames
//!
//! This crate provides the types that flow through the pipeline:
//! - `TelemetrySample` / `SampleTime` - a validated rate-of-penetration point
//! - `validate` - the gate from raw broker JSON to a typed sample
//! - `ServerFrame` / `ClientFrame` - viewer-facing WebSocket frames
//!
//! # Design Principles
//!
//! - **Pure validation**: `validate` performs no I/O and reads no clock, so
//!   the same payload always yields the same result
//! - **Arc-friendly**: samples are plain data, cheap to clone and safe to
//!   share across the fan-out path
//! - **Opaque time**: producer timestamps pass through unmodified, whether
//!   textual or integer epoch

mod error;
mod frame;
mod sample;

pub use error::ValidationError;
pub use frame::{ClientFrame, ServerFrame, now_rfc3339};
pub use sample::{SampleTime, TelemetrySample, validate};
