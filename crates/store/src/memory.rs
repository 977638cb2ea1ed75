//! In-memory sample store
//!
//! The built-in backend: rows live in process memory under a hard cap with
//! the oldest evicted first. Good for development rigs, demos and tests;
//! durable backends implement `SampleStore` behind the same contract.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use wellstream_protocol::{SampleTime, TelemetrySample};

use crate::{SampleStore, StoreError, UpsertOutcome};

/// Default row cap
const DEFAULT_MAX_ROWS: usize = 100_000;

/// Dedup key: exact depth bits plus the producer timestamp
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SampleKey {
    depth_bits: u64,
    time: SampleTime,
}

impl SampleKey {
    fn of(sample: &TelemetrySample) -> Self {
        // -0.0 and 0.0 are the same depth
        let depth = if sample.depth == 0.0 { 0.0 } else { sample.depth };
        Self {
            depth_bits: depth.to_bits(),
            time: sample.time.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Rows {
    by_key: HashMap<SampleKey, TelemetrySample>,
    order: VecDeque<SampleKey>,
}

/// Bounded in-memory store keyed on `(depth, time)`
#[derive(Debug)]
pub struct MemoryStore {
    rows: Mutex<Rows>,
    max_rows: usize,
}

impl MemoryStore {
    /// Create a store with the default row cap
    pub fn new() -> Self {
        Self::with_max_rows(DEFAULT_MAX_ROWS)
    }

    /// Create a store keeping at most `max_rows` rows
    pub fn with_max_rows(max_rows: usize) -> Self {
        Self {
            rows: Mutex::new(Rows::default()),
            max_rows: max_rows.max(1),
        }
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.lock().order.len()
    }

    /// Check whether the store holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.lock().order.is_empty()
    }

    /// Snapshot of the stored rows in insertion order
    pub fn rows(&self) -> Vec<TelemetrySample> {
        let rows = self.rows.lock();
        rows.order
            .iter()
            .filter_map(|key| rows.by_key.get(key).cloned())
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn upsert(&self, sample: &TelemetrySample) -> Result<UpsertOutcome, StoreError> {
        let key = SampleKey::of(sample);
        let mut rows = self.rows.lock();

        if rows.by_key.contains_key(&key) {
            return Ok(UpsertOutcome::Duplicate);
        }

        if rows.order.len() >= self.max_rows
            && let Some(oldest) = rows.order.pop_front()
        {
            rows.by_key.remove(&oldest);
        }

        rows.by_key.insert(key.clone(), sample.clone());
        rows.order.push_back(key);
        Ok(UpsertOutcome::Inserted)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
