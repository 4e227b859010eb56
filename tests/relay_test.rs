//! Relay Integration Tests
//!
//! Drives the full pipeline (hooks on an in-process queue, the bounded
//! intake, the aggregation worker, the flush executor) against in-memory
//! counter stores, verifying:
//! - per-second aggregation of hook-driven and direct logs
//! - the forced terminal flush on destroy
//! - queue-size snapshots taken at flush time
//! - eviction and loss accounting when the store fails
//! - post-destroy behavior of `log()` and of still-bound hooks

use std::sync::Arc;

use stats_relay::queue::MemoryQueue;
use stats_relay::stats::{StatsConfig, StatsError, StatsLogger};
use stats_relay::store::{FaultyCounterStore, MemoryCounterStore};

fn relay(
    queue: &Arc<MemoryQueue>,
    store: &MemoryCounterStore,
) -> StatsLogger {
    StatsLogger::new(
        queue.clone(),
        Box::new(store.clone()),
        StatsConfig::test(),
    )
}

#[tokio::test]
async fn test_push_hooks_aggregate_and_flush_on_destroy() {
    let queue = Arc::new(MemoryQueue::new("uq1"));
    let store = MemoryCounterStore::new();
    let logger = relay(&queue, &store);
    logger.bind().unwrap();

    queue.push("a").await;
    queue.push("b").await;

    // Destroy trails the hook events through the intake, so the terminal
    // flush sees both of them whatever the wall clock did in between.
    logger.destroy().await;

    assert_eq!(store.sum_with_prefix("uq1:push:"), 2);
    assert_eq!(store.sum_with_prefix("uq1:pop:"), 0);
    // Size snapshots are taken at flush time: both items still queued.
    let sizes = store.values_with_prefix("uq1:size:");
    assert!(!sizes.is_empty());
    assert!(sizes.iter().all(|&s| s == 2));
}

#[tokio::test]
async fn test_pop_accounting_nets_out_queue_size() {
    let queue = Arc::new(MemoryQueue::new("uqdq1"));
    let store = MemoryCounterStore::new();
    let logger = relay(&queue, &store);
    logger.bind().unwrap();

    queue.push("j1").await;
    queue.push("j2").await;
    assert!(queue.pop().await.is_some());
    assert!(queue.pop().await.is_some());

    logger.destroy().await;

    assert_eq!(store.sum_with_prefix("uqdq1:push:"), 2);
    assert_eq!(store.sum_with_prefix("uqdq1:pop:"), 2);
    // Pushed twice, popped twice: every snapshot shows an empty queue.
    let sizes = store.values_with_prefix("uqdq1:size:");
    assert!(!sizes.is_empty());
    assert!(sizes.iter().all(|&s| s == 0));
}

#[tokio::test]
async fn test_policy_flush_after_gap() {
    let queue = Arc::new(MemoryQueue::new("gapq"));
    let store = MemoryCounterStore::new();
    let logger = relay(&queue, &store);
    logger.bind().unwrap();

    queue.push("a").await;

    // Let the push's bucket age out of the grace window, then trigger the
    // flush policy with an unrelated direct log.
    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
    logger.log("gapq:ping", 1).await.unwrap();

    // The worker flushes inline; give it a moment to drain the trigger.
    let mut waited = 0;
    while store.sum_with_prefix("gapq:push:") == 0 && waited < 1000 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        waited += 10;
    }

    assert_eq!(store.sum_with_prefix("gapq:push:"), 1);
    // The snapshot taken with that flush sees the one still-queued item.
    let sizes = store.values_with_prefix("gapq:size:");
    assert!(!sizes.is_empty());
    assert!(sizes.iter().all(|&s| s == 1));

    logger.destroy().await;
}

#[tokio::test]
async fn test_multi_hooks_log_batch_sizes() {
    let queue = Arc::new(MemoryQueue::new("uq2"));
    let store = MemoryCounterStore::new();
    let logger = relay(&queue, &store);
    logger.bind().unwrap();

    queue
        .multi_push(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        .await;
    let taken = queue.multi_pop(2).await;
    assert_eq!(taken.len(), 2);
    queue.ack(&taken[0]).await;

    logger.destroy().await;

    assert_eq!(store.sum_with_prefix("uq2:push:"), 3);
    assert_eq!(store.sum_with_prefix("uq2:pop:"), 2);
    assert_eq!(store.sum_with_prefix("uq2:ack:"), 1);
}

#[tokio::test]
async fn test_direct_logs_aggregate_across_producers() {
    let queue = Arc::new(MemoryQueue::new("load"));
    let store = MemoryCounterStore::new();
    let logger = Arc::new(StatsLogger::new(
        queue.clone(),
        Box::new(store.clone()),
        StatsConfig::default(),
    ));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let logger = logger.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..50 {
                logger.log("load:hits", 1).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    logger.destroy().await;

    assert_eq!(store.sum_with_prefix("load:hits:"), 400);
}

#[tokio::test]
async fn test_every_key_carries_the_ttl() {
    let queue = Arc::new(MemoryQueue::new("uq3"));
    let store = MemoryCounterStore::new();
    let logger = relay(&queue, &store);
    logger.bind().unwrap();

    queue.push("a").await;
    queue.pop().await;
    logger.destroy().await;

    let keys = store.keys();
    assert!(!keys.is_empty());
    for key in keys {
        assert_eq!(store.ttl_of(&key), Some(7200), "ttl missing on {}", key);
    }
}

#[tokio::test]
async fn test_store_failures_are_counted_not_retried() {
    let queue = Arc::new(MemoryQueue::new("uq4"));
    let store = FaultyCounterStore::new();
    store.fail_incr(true);
    store.fail_set(true);
    let logger = StatsLogger::new(
        queue.clone(),
        Box::new(store.clone()),
        StatsConfig::test(),
    );
    logger.bind().unwrap();

    queue.push("a").await;
    logger.destroy().await;

    // One counter write and one size write attempted, both lost, both
    // counted; nothing reached the store and nothing is left to retry.
    assert_eq!(store.incr_attempts(), 1);
    assert_eq!(store.set_attempts(), 1);
    assert_eq!(logger.dropped_writes(), 2);
    assert_eq!(store.inner().key_count(), 0);
}

#[tokio::test]
async fn test_log_after_destroy_fails_and_hooks_drop_silently() {
    let queue = Arc::new(MemoryQueue::new("uq5"));
    let store = MemoryCounterStore::new();
    let logger = relay(&queue, &store);
    logger.bind().unwrap();

    queue.push("a").await;
    logger.destroy().await;

    assert_eq!(logger.log("uq5:push", 1).await, Err(StatsError::Closed));

    // The queue itself keeps working; the bound hook's event just has
    // nowhere to go anymore.
    queue.push("b").await;
    assert_eq!(queue.len(), 2);
    assert_eq!(store.sum_with_prefix("uq5:push:"), 1);
}
