//! Fire-and-forget persistence queue
//!
//! `StoreWriter` decouples ingestion from the store. `StoreQueue::enqueue`
//! is a bounded non-blocking handoff, and a drain task absorbs every store
//! outcome; the enqueuing side never waits for, or hears about,
//! persistence. Overflow drops the write, never the broadcast.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use wellstream_protocol::TelemetrySample;

use crate::{SampleStore, UpsertOutcome};

/// Atomic counters shared between the queue handles and the drain task
#[derive(Debug, Default)]
struct WriterMetrics {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    inserted: AtomicU64,
    duplicates: AtomicU64,
    errors: AtomicU64,
}

/// Statistics about the persistence queue
#[derive(Debug, Clone, Copy)]
pub struct WriterStats {
    /// Samples accepted into the queue
    pub enqueued: u64,
    /// Samples lost to a full or closed queue
    pub dropped: u64,
    /// Rows the store reported inserted
    pub inserted: u64,
    /// Writes skipped as duplicates
    pub duplicates: u64,
    /// Writes the store failed
    pub errors: u64,
}

/// Cloneable enqueue handle given to ingestion
#[derive(Debug, Clone)]
pub struct StoreQueue {
    sender: mpsc::Sender<Arc<TelemetrySample>>,
    metrics: Arc<WriterMetrics>,
}

impl StoreQueue {
    /// Queue a sample for persistence without blocking
    ///
    /// A full queue (store slower than ingestion) or a closed writer drops
    /// the sample; the caller never sees a failure.
    pub fn enqueue(&self, sample: Arc<TelemetrySample>) {
        match self.sender.try_send(sample) {
            Ok(()) => {
                self.metrics.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                if self.metrics.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                    warn!("store queue full; dropping writes");
                } else {
                    trace!("store queue full; write dropped");
                }
            }
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            enqueued: self.metrics.enqueued.load(Ordering::Relaxed),
            dropped: self.metrics.dropped.load(Ordering::Relaxed),
            inserted: self.metrics.inserted.load(Ordering::Relaxed),
            duplicates: self.metrics.duplicates.load(Ordering::Relaxed),
            errors: self.metrics.errors.load(Ordering::Relaxed),
        }
    }
}

/// Owns the drain task between the queue and a `SampleStore`
pub struct StoreWriter {
    queue: StoreQueue,
    task: JoinHandle<()>,
}

impl StoreWriter {
    /// Spawn the drain task over `store` with a queue of `queue_size`
    /// samples
    pub fn spawn(store: Arc<dyn SampleStore>, queue_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));
        let metrics = Arc::new(WriterMetrics::default());
        let task = tokio::spawn(drain(store, receiver, Arc::clone(&metrics)));

        Self {
            queue: StoreQueue { sender, metrics },
            task,
        }
    }

    /// Get a cheap enqueue handle for ingestion
    pub fn queue(&self) -> StoreQueue {
        self.queue.clone()
    }

    /// Get writer statistics
    pub fn stats(&self) -> WriterStats {
        self.queue.stats()
    }

    /// Drain everything queued, then stop
    ///
    /// Waits for the queue to close, so every `StoreQueue` handle must be
    /// dropped first; the composition root tears ingestion down before
    /// calling this.
    pub async fn close(self) {
        let Self { queue, task } = self;
        drop(queue);
        if task.await.is_err() {
            warn!("store writer task panicked");
        }
    }
}

async fn drain(
    store: Arc<dyn SampleStore>,
    mut receiver: mpsc::Receiver<Arc<TelemetrySample>>,
    metrics: Arc<WriterMetrics>,
) {
    while let Some(sample) = receiver.recv().await {
        match store.upsert(&sample).await {
            Ok(UpsertOutcome::Inserted) => {
                metrics.inserted.fetch_add(1, Ordering::Relaxed);
            }
            Ok(UpsertOutcome::Duplicate) => {
                metrics.duplicates.fetch_add(1, Ordering::Relaxed);
                debug!(depth = sample.depth, time = %sample.time, "duplicate sample ignored");
            }
            Err(error) => {
                metrics.errors.fetch_add(1, Ordering::Relaxed);
                warn!(%error, depth = sample.depth, "sample write failed");
            }
        }
    }
    debug!("store writer drained");
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod tests;
