//! Stats Relay Demo
//!
//! Wires an in-process queue through the relay into an in-memory counter
//! store, drives some traffic, then destroys the logger and dumps every key
//! the terminal flush produced.
//!
//! Usage:
//!   cargo run --bin stats-demo

use std::sync::Arc;

use stats_relay::queue::MemoryQueue;
use stats_relay::stats::{StatsConfig, StatsLogger};
use stats_relay::store::MemoryCounterStore;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let queue = Arc::new(MemoryQueue::new("demo"));
    let store = MemoryCounterStore::new();
    let logger = StatsLogger::new(
        queue.clone(),
        Box::new(store.clone()),
        StatsConfig::default(),
    );
    logger.bind().expect("first bind");

    info!("driving traffic through the demo queue");

    queue.push("job-1").await;
    queue.push("job-2").await;
    queue
        .multi_push(vec!["job-3".to_string(), "job-4".to_string()])
        .await;

    while let Some(job) = queue.pop().await {
        queue.ack(&job).await;
    }

    // Direct logging works too; hooks are just one producer.
    logger.log("demo:custom", 7).await.expect("intake open");

    logger.destroy().await;

    println!("flushed keys:");
    for key in store.keys() {
        println!("  {} = {} (ttl {}s)", key, store.get(&key).unwrap_or(0), store.ttl_of(&key).unwrap_or(0));
    }
    println!("dropped writes: {}", logger.dropped_writes());
}
