//! Subscriber bookkeeping for the fan-out bus
//!
//! Each registered consumer gets a `Subscriber` entry that tracks:
//! - Unique ID for the registration
//! - Queue sender for async sample delivery
//! - Count of samples dropped against it
//!
//! `SubscriberSet` handles registration, removal, and the fan-out pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use wellstream_protocol::TelemetrySample;

/// A single registered consumer
#[derive(Debug)]
pub(crate) struct Subscriber {
    /// Unique identifier
    id: u64,
    /// Queue into the consumer's pump
    sender: mpsc::Sender<Arc<TelemetrySample>>,
    /// Samples dropped because the queue was full
    dropped: AtomicU64,
}

/// What happened to one consumer during a fan-out pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Enqueue {
    /// Sample moved into the consumer's queue
    Delivered,
    /// Queue full; sample lost for this consumer, registration kept
    Dropped,
    /// Receiver gone; entry is ready to be swept
    Gone,
}

impl Subscriber {
    fn new(id: u64, sender: mpsc::Sender<Arc<TelemetrySample>>) -> Self {
        Self {
            id,
            sender,
            dropped: AtomicU64::new(0),
        }
    }

    /// Get the subscriber ID
    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Queue a sample without blocking the publisher
    #[inline]
    pub(crate) fn enqueue(&self, sample: Arc<TelemetrySample>) -> Enqueue {
        match self.sender.try_send(sample) {
            Ok(()) => Enqueue::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => {
                // first drop per consumer at warn, the rest at trace
                if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                    warn!(subscriber_id = self.id, "consumer queue full; dropping samples");
                } else {
                    trace!(subscriber_id = self.id, "consumer queue full; sample dropped");
                }
                Enqueue::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Enqueue::Gone,
        }
    }

    /// Check if the consumer's receiver still exists
    #[inline]
    pub(crate) fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Opaque registration token returned by `SampleBus::subscribe`
///
/// Dropping the token does not unsubscribe; give it back via
/// `SampleBus::unsubscribe` when the consumer goes away. A consumer that
/// merely drops its receiver is swept on a later publish pass instead.
#[derive(Debug)]
pub struct SubscriberHandle {
    id: u64,
}

impl SubscriberHandle {
    /// Registration id, stable for the lifetime of the subscription
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Result of one fan-out pass over the membership
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FanOut {
    /// Consumers whose queue accepted the sample
    pub delivered: usize,
    /// Consumers that lost the sample to a full queue
    pub dropped: usize,
    /// At least one consumer's receiver is gone
    pub saw_gone: bool,
}

/// Membership table for registered consumers
#[derive(Debug)]
pub(crate) struct SubscriberSet {
    /// Active subscribers
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
    /// Next registration id
    next_id: AtomicU64,
}

impl SubscriberSet {
    /// Create an empty membership table
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new consumer with a queue of the given capacity
    ///
    /// Returns the handle and the receiving end of the queue.
    pub(crate) fn insert(
        &self,
        capacity: usize,
    ) -> (SubscriberHandle, mpsc::Receiver<Arc<TelemetrySample>>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.subscribers.write().push(Arc::new(Subscriber::new(id, sender)));

        (SubscriberHandle { id }, receiver)
    }

    /// Remove a consumer by id
    ///
    /// Returns false when the id is not registered (already removed).
    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id() != id);
        subscribers.len() != before
    }

    /// Get number of active consumers
    pub(crate) fn count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Check whether any consumer is registered
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Fan a sample out to every registered consumer
    ///
    /// Consumer order within the pass is arbitrary; nothing downstream may
    /// rely on it. The membership lock is held only while samples move into
    /// queues, never across a network send.
    pub(crate) fn fan_out(&self, sample: &Arc<TelemetrySample>) -> FanOut {
        let subscribers = self.subscribers.read();
        let mut pass = FanOut::default();

        for subscriber in subscribers.iter() {
            match subscriber.enqueue(Arc::clone(sample)) {
                Enqueue::Delivered => pass.delivered += 1,
                Enqueue::Dropped => pass.dropped += 1,
                Enqueue::Gone => pass.saw_gone = true,
            }
        }

        pass
    }

    /// Drop consumers whose receiver is gone
    pub(crate) fn sweep(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.is_connected());
        before - subscribers.len()
    }
}

#[cfg(test)]
#[path = "subscriber_test.rs"]
mod tests;
