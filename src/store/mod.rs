//! Counter Store Abstraction
//!
//! Trait seam over the durable counter store the relay flushes into,
//! following the storage-trait pattern used elsewhere in this codebase.
//!
//! ## Implementations
//!
//! - `MemoryCounterStore`: for unit and integration tests
//! - `FaultyCounterStore`: deterministic failure injection for tests
//! - `RedisCounterStore`: for production (atomic pipeline + SETEX)

mod memory;
mod redis;

pub use memory::{FaultyCounterStore, MemoryCounterStore};
pub use self::redis::RedisCounterStore;

use async_trait::async_trait;
use std::io::Error as IoError;

/// Error type for counter store operations
#[derive(Debug)]
pub enum StoreError {
    /// I/O or transport error
    Io(IoError),
    /// Store-side command or protocol failure
    Protocol(String),
    /// Connection released; no further operations accepted
    Closed,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store I/O error: {}", e),
            StoreError::Protocol(msg) => write!(f, "store protocol error: {}", msg),
            StoreError::Closed => write!(f, "store connection closed"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<IoError> for StoreError {
    fn from(e: IoError) -> Self {
        StoreError::Io(e)
    }
}

/// Trait for durable counter store backends.
///
/// Every written key carries a bounded time-to-live; the store is expected
/// to expire keys on its own. Both operations must be atomic on the store
/// side: a counter increment is never visible without its expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add `delta` to the integer at `key` and set its expiry.
    async fn incr_by_expire(&self, key: &str, delta: i64, ttl_secs: u64) -> Result<(), StoreError>;

    /// Set `key` to `value` with an expiry, replacing any prior value.
    async fn set_with_ttl(&self, key: &str, value: i64, ttl_secs: u64) -> Result<(), StoreError>;
}
