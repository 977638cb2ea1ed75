//! SampleBus - the broadcast point between ingestion and live consumers
//!
//! `SampleBus` is what the broker connector publishes into and what gateway
//! connections subscribe to. It provides:
//!
//! - Near-zero cost when no consumers are registered (inline flag check)
//! - Per-consumer queues so one slow viewer cannot stall the rest
//! - Automatic sweeping of consumers whose receiver disappeared
//!
//! # Usage
//!
//! ```ignore
//! let bus = Arc::new(SampleBus::new());
//!
//! // In the ingestion hot path:
//! bus.publish(Arc::new(sample));  // no-op if nobody listens
//!
//! // For each new gateway connection:
//! let (handle, mut rx) = bus.subscribe();
//! // ... pump rx, then:
//! bus.unsubscribe(&handle);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{debug, trace};

use wellstream_protocol::TelemetrySample;

use crate::subscriber::{SubscriberHandle, SubscriberSet};
use tokio::sync::mpsc;

/// Default per-consumer queue capacity
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// The fan-out registry
#[derive(Debug)]
pub struct SampleBus {
    /// Membership table
    subscribers: SubscriberSet,
    /// Queue capacity handed to each new consumer
    queue_capacity: usize,
    /// Quick check flag for the publish hot path
    has_subscribers: AtomicBool,
    /// Samples that entered a non-empty fan-out pass
    published: AtomicU64,
    /// Sample handoffs that reached a consumer queue
    delivered: AtomicU64,
    /// Sample handoffs lost to full consumer queues
    dropped: AtomicU64,
    /// Consumers removed because their receiver was gone
    swept: AtomicU64,
}

impl SampleBus {
    /// Create a bus with the default per-consumer queue capacity
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a bus handing each consumer a queue of `capacity` samples
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            subscribers: SubscriberSet::new(),
            queue_capacity: capacity.max(1),
            has_subscribers: AtomicBool::new(false),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            swept: AtomicU64::new(0),
        }
    }

    /// Register a consumer
    ///
    /// Returns the registration handle and the consumer's sample queue.
    /// Registration itself never fails; admission control belongs to the
    /// caller (the gateway caps connections, not the bus).
    pub fn subscribe(&self) -> (SubscriberHandle, mpsc::Receiver<Arc<TelemetrySample>>) {
        let (handle, receiver) = self.subscribers.insert(self.queue_capacity);
        self.has_subscribers.store(true, Ordering::Relaxed);

        debug!(subscriber_id = handle.id(), "bus consumer registered");

        (handle, receiver)
    }

    /// Remove a consumer
    ///
    /// Unsubscribing a handle that was already removed is a no-op returning
    /// false, so teardown paths can overlap safely.
    pub fn unsubscribe(&self, handle: &SubscriberHandle) -> bool {
        let removed = self.subscribers.remove(handle.id());

        if removed {
            debug!(subscriber_id = handle.id(), "bus consumer removed");
            self.refresh_flag();
        } else {
            trace!(subscriber_id = handle.id(), "unsubscribe ignored; already gone");
        }

        removed
    }

    /// Publish a sample to every registered consumer
    ///
    /// This is the ingestion hot path. Delivery is a queue handoff per
    /// consumer in arbitrary cross-consumer order; per-consumer order is the
    /// publish order. A full consumer queue loses the sample for that
    /// consumer only. Returns how many consumers received it.
    #[inline]
    pub fn publish(&self, sample: Arc<TelemetrySample>) -> usize {
        // Fast path: no consumers = no work
        if !self.has_subscribers.load(Ordering::Relaxed) {
            return 0;
        }

        self.published.fetch_add(1, Ordering::Relaxed);

        let pass = self.subscribers.fan_out(&sample);
        if pass.delivered > 0 {
            self.delivered.fetch_add(pass.delivered as u64, Ordering::Relaxed);
            trace!(delivered = pass.delivered, "sample fanned out");
        }
        if pass.dropped > 0 {
            self.dropped.fetch_add(pass.dropped as u64, Ordering::Relaxed);
        }

        // membership writes happen outside the fan-out read lock
        if pass.saw_gone {
            self.sweep();
        }

        pass.delivered
    }

    /// Drop consumers whose receiver is gone
    ///
    /// Runs automatically after a publish pass that saw one; callable
    /// directly by embedders that publish rarely.
    pub fn sweep(&self) -> usize {
        let removed = self.subscribers.sweep();

        if removed > 0 {
            debug!(removed, "swept disconnected bus consumers");
            self.swept.fetch_add(removed as u64, Ordering::Relaxed);
            self.refresh_flag();
        }

        removed
    }

    /// Get the number of registered consumers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.count()
    }

    /// Check if any consumer is registered
    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.has_subscribers.load(Ordering::Relaxed)
    }

    /// Get bus statistics
    pub fn stats(&self) -> BusStats {
        BusStats {
            subscribers: self.subscribers.count(),
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }

    fn refresh_flag(&self) {
        if self.subscribers.is_empty() {
            self.has_subscribers.store(false, Ordering::Relaxed);
        }
    }
}

impl Default for SampleBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the bus
#[derive(Debug, Clone, Copy)]
pub struct BusStats {
    /// Current number of registered consumers
    pub subscribers: usize,
    /// Samples that entered a non-empty fan-out pass
    pub published: u64,
    /// Handoffs that reached a consumer queue
    pub delivered: u64,
    /// Handoffs lost to full consumer queues
    pub dropped: u64,
    /// Consumers removed by sweeps
    pub swept: u64,
}

#[cfg(test)]
#[path = "sample_bus_test.rs"]
mod tests;
