//! In-memory counter stores for tests and demos.
//!
//! `MemoryCounterStore` records values and their TTLs without enforcing
//! expiry, so tests can assert on both. `FaultyCounterStore` wraps it with
//! deterministic failure injection and attempt accounting, which is how the
//! eviction-on-failure and dropped-write paths get exercised.

use super::{CounterStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct Entry {
    value: i64,
    ttl_secs: u64,
}

/// In-memory counter store for unit tests, integration tests, and the demo.
#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        MemoryCounterStore {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Current value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.entries.lock().get(key).map(|e| e.value)
    }

    /// TTL recorded for `key` on its last write, if present.
    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.entries.lock().get(key).map(|e| e.ttl_secs)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn key_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// All keys, sorted. Handy for scanning `<queue>:push:*` style families
    /// in tests without depending on which second a write landed in.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Sum of values across every key starting with `prefix`.
    pub fn sum_with_prefix(&self, prefix: &str) -> i64 {
        self.entries
            .lock()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(_, e)| e.value)
            .sum()
    }

    /// Values of every key starting with `prefix`, sorted by key.
    pub fn values_with_prefix(&self, prefix: &str) -> Vec<i64> {
        let entries = self.entries.lock();
        let mut matched: Vec<(&String, &Entry)> =
            entries.iter().filter(|(k, _)| k.starts_with(prefix)).collect();
        matched.sort_by_key(|(k, _)| (*k).clone());
        matched.into_iter().map(|(_, e)| e.value).collect()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr_by_expire(&self, key: &str, delta: i64, ttl_secs: u64) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.to_string()).or_default();
        entry.value += delta;
        entry.ttl_secs = ttl_secs;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: i64, ttl_secs: u64) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), Entry { value, ttl_secs });
        Ok(())
    }
}

/// Counter store wrapper with deterministic failure injection.
///
/// Failures are toggled per operation kind rather than sampled, so a test
/// can make every counter write fail while size snapshots succeed (or the
/// reverse) and then assert on the attempt counters.
#[derive(Clone, Default)]
pub struct FaultyCounterStore {
    inner: MemoryCounterStore,
    fail_incr: Arc<AtomicBool>,
    fail_set: Arc<AtomicBool>,
    incr_attempts: Arc<AtomicU64>,
    set_attempts: Arc<AtomicU64>,
}

impl FaultyCounterStore {
    pub fn new() -> Self {
        FaultyCounterStore::default()
    }

    /// Make every `incr_by_expire` call fail (or succeed again).
    pub fn fail_incr(&self, fail: bool) {
        self.fail_incr.store(fail, Ordering::SeqCst);
    }

    /// Make every `set_with_ttl` call fail (or succeed again).
    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn incr_attempts(&self) -> u64 {
        self.incr_attempts.load(Ordering::SeqCst)
    }

    pub fn set_attempts(&self) -> u64 {
        self.set_attempts.load(Ordering::SeqCst)
    }

    /// The wrapped store, for asserting on what did get written.
    pub fn inner(&self) -> &MemoryCounterStore {
        &self.inner
    }
}

#[async_trait]
impl CounterStore for FaultyCounterStore {
    async fn incr_by_expire(&self, key: &str, delta: i64, ttl_secs: u64) -> Result<(), StoreError> {
        self.incr_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_incr.load(Ordering::SeqCst) {
            return Err(StoreError::Protocol("injected increment failure".to_string()));
        }
        self.inner.incr_by_expire(key, delta, ttl_secs).await
    }

    async fn set_with_ttl(&self, key: &str, value: i64, ttl_secs: u64) -> Result<(), StoreError> {
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(StoreError::Protocol("injected set failure".to_string()));
        }
        self.inner.set_with_ttl(key, value, ttl_secs).await
    }
}
