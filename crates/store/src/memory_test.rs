//! Tests for the in-memory store

use super::*;

fn sample(depth: f64, time: &str, rop: f64) -> TelemetrySample {
    TelemetrySample::new(depth, time, rop)
}

// ============================================================================
// Upsert contract
// ============================================================================

#[tokio::test]
async fn test_second_upsert_of_same_key_is_duplicate() {
    let store = MemoryStore::new();
    let first = sample(100.5, "2024-06-01T10:00:00Z", 15.2);

    assert_eq!(store.upsert(&first).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(store.upsert(&first).await.unwrap(), UpsertOutcome::Duplicate);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_duplicate_keeps_the_stored_row() {
    let store = MemoryStore::new();
    store.upsert(&sample(100.5, "t1", 15.2)).await.unwrap();

    // same key, different reading: insert-or-ignore keeps the original
    let outcome = store.upsert(&sample(100.5, "t1", 99.9)).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Duplicate);
    assert_eq!(store.rows()[0].rop, 15.2);
}

#[tokio::test]
async fn test_key_is_depth_and_time() {
    let store = MemoryStore::new();
    store.upsert(&sample(100.5, "t1", 1.0)).await.unwrap();

    // different time, same depth
    assert_eq!(
        store.upsert(&sample(100.5, "t2", 1.0)).await.unwrap(),
        UpsertOutcome::Inserted
    );
    // different depth, same time
    assert_eq!(
        store.upsert(&sample(101.0, "t1", 1.0)).await.unwrap(),
        UpsertOutcome::Inserted
    );
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_epoch_and_text_times_are_distinct_keys() {
    let store = MemoryStore::new();
    store
        .upsert(&TelemetrySample::new(1.0, 1717236000, 1.0))
        .await
        .unwrap();

    // time is opaque: the string "1717236000" is not the epoch 1717236000
    let textual = TelemetrySample::new(1.0, "1717236000", 1.0);
    assert_eq!(store.upsert(&textual).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_negative_zero_depth_collapses() {
    let store = MemoryStore::new();
    store.upsert(&sample(0.0, "t1", 1.0)).await.unwrap();

    let outcome = store.upsert(&sample(-0.0, "t1", 1.0)).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Duplicate);
}

// ============================================================================
// Bounding
// ============================================================================

#[tokio::test]
async fn test_oldest_row_is_evicted_at_the_cap() {
    let store = MemoryStore::with_max_rows(2);
    store.upsert(&sample(1.0, "t1", 1.0)).await.unwrap();
    store.upsert(&sample(2.0, "t2", 1.0)).await.unwrap();
    store.upsert(&sample(3.0, "t3", 1.0)).await.unwrap();

    assert_eq!(store.len(), 2);
    let depths: Vec<f64> = store.rows().iter().map(|s| s.depth).collect();
    assert_eq!(depths, vec![2.0, 3.0]);

    // the evicted key is insertable again
    assert_eq!(
        store.upsert(&sample(1.0, "t1", 1.0)).await.unwrap(),
        UpsertOutcome::Inserted
    );
}

#[tokio::test]
async fn test_rows_snapshot_is_in_insertion_order() {
    let store = MemoryStore::new();
    assert!(store.is_empty());

    for n in 0..5 {
        store.upsert(&sample(n as f64, "t", 1.0)).await.unwrap();
    }

    let depths: Vec<f64> = store.rows().iter().map(|s| s.depth).collect();
    assert_eq!(depths, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}
