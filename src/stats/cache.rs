//! Time-Bucketed Stat Cache
//!
//! Maps epoch-second → (metric name → accumulated delta). Owned and mutated
//! by exactly one task, the relay worker; nothing here synchronizes because
//! ownership already does. The struct also carries the two pieces of flush
//! state: the `last_flush` watermark and the `flushing` re-entrancy guard.
//!
//! Buckets for the current and immediately preceding second are never
//! drained: that one-full-second grace window lets late events for a
//! second land before its bucket ships.

use std::collections::HashMap;

/// How far behind `now` a bucket must be before it is drained. A bucket at
/// second `sec` is flushable once `sec <= now - GRACE_SECS`.
pub(crate) const GRACE_SECS: i64 = 2;

#[derive(Debug, Default)]
pub struct StatsCache {
    buckets: HashMap<i64, HashMap<String, i64>>,
    last_flush: i64,
    flushing: bool,
}

impl StatsCache {
    pub fn new() -> Self {
        StatsCache::default()
    }

    /// Fold `delta` into the bucket for `now`, allocating it on first use.
    pub fn record(&mut self, name: &str, delta: i64, now: i64) {
        let bucket = self.buckets.entry(now).or_default();
        *bucket.entry(name.to_string()).or_insert(0) += delta;
    }

    /// Flush policy: a flush may run once the clock has moved past the last
    /// flush boundary and no flush is already executing.
    pub fn should_flush(&self, now: i64) -> bool {
        now > self.last_flush && !self.flushing
    }

    pub fn begin_flush(&mut self) {
        debug_assert!(!self.flushing, "flush re-entered");
        self.flushing = true;
    }

    /// Remove and return every bucket outside the grace window. Removal up
    /// front is what makes eviction unconditional: a bucket never returns
    /// to the cache, whatever happens to its writes.
    pub fn take_flushable(&mut self, now: i64) -> Vec<(i64, HashMap<String, i64>)> {
        let eligible: Vec<i64> = self
            .buckets
            .keys()
            .copied()
            .filter(|&sec| sec <= now - GRACE_SECS)
            .collect();

        eligible
            .into_iter()
            .filter_map(|sec| self.buckets.remove(&sec).map(|bucket| (sec, bucket)))
            .collect()
    }

    /// Close out a flush pass, advancing the watermark to `now`.
    pub fn end_flush(&mut self, now: i64) {
        self.flushing = false;
        self.last_flush = now;
    }

    pub fn last_flush(&self) -> i64 {
        self.last_flush
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains_second(&self, sec: i64) -> bool {
        self.buckets.contains_key(&sec)
    }

    /// Accumulated value for `name` in the bucket at `sec`, if resident.
    pub fn value_at(&self, sec: i64, name: &str) -> Option<i64> {
        self.buckets.get(&sec).and_then(|b| b.get(name)).copied()
    }
}
