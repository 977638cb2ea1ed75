//! Decode, validate, and forward inbound payloads
//!
//! One `SampleIntake` sits between the broker link and the rest of the
//! process. Every payload is decoded as JSON and validated; rejects are
//! counted and logged here and go no further. Accepted samples are queued
//! for the store (when one is attached) and then published to the bus.
//! The bus publish is unconditional: a full, failing, or absent store
//! queue never withholds a sample from live consumers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{debug, trace, warn};

use wellstream_bus::SampleBus;
use wellstream_protocol::validate;
use wellstream_store::StoreQueue;

/// Intake counters
#[derive(Debug, Default)]
struct IntakeMetrics {
    /// Payloads received from the broker
    received: AtomicU64,
    /// Payloads dropped by decode or validation
    rejected: AtomicU64,
    /// Samples published to the bus
    published: AtomicU64,
}

/// Snapshot of intake counters
#[derive(Debug, Clone, Copy)]
pub struct IntakeStats {
    pub received: u64,
    pub rejected: u64,
    pub published: u64,
}

/// Inbound payload handler shared by the link task and status readers
#[derive(Clone)]
pub struct SampleIntake {
    bus: Arc<SampleBus>,
    store: Option<StoreQueue>,
    metrics: Arc<IntakeMetrics>,
}

impl SampleIntake {
    /// Create an intake that publishes to `bus` and, when `store` is
    /// given, queues every accepted sample for persistence first
    pub fn new(bus: Arc<SampleBus>, store: Option<StoreQueue>) -> Self {
        Self {
            bus,
            store,
            metrics: Arc::new(IntakeMetrics::default()),
        }
    }

    /// Handle one raw broker payload
    ///
    /// Deliberately synchronous: decode and validation are pure, the store
    /// enqueue is non-blocking, and the bus publish only moves the sample
    /// into per-consumer queues.
    pub fn handle_payload(&self, payload: &[u8]) {
        self.metrics.received.fetch_add(1, Ordering::Relaxed);

        let raw: Value = match serde_json::from_slice(payload) {
            Ok(raw) => raw,
            Err(error) => {
                self.reject(&error);
                return;
            }
        };

        let sample = match validate(&raw) {
            Ok(sample) => sample,
            Err(error) => {
                self.reject(&error);
                return;
            }
        };

        trace!(depth = sample.depth, time = %sample.time, "sample accepted");
        let sample = Arc::new(sample);

        if let Some(queue) = &self.store {
            queue.enqueue(Arc::clone(&sample));
        }

        // live delivery never waits on persistence
        self.bus.publish(sample);
        self.metrics.published.fetch_add(1, Ordering::Relaxed);
    }

    fn reject(&self, error: &dyn std::fmt::Display) {
        let rejected = self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
        if rejected == 0 {
            warn!(%error, "dropping invalid broker payload");
        } else {
            debug!(%error, "dropping invalid broker payload");
        }
    }

    pub fn stats(&self) -> IntakeStats {
        IntakeStats {
            received: self.metrics.received.load(Ordering::Relaxed),
            rejected: self.metrics.rejected.load(Ordering::Relaxed),
            published: self.metrics.published.load(Ordering::Relaxed),
        }
    }
}
