//! Per-Second Stat Batching
//!
//! The relay pipeline: producers log named deltas into a bounded intake
//! channel; a single worker task folds them into per-second buckets and
//! periodically flushes buckets older than the grace window to the counter
//! store.
//!
//! ```text
//! hooks / log() ──► intake (bounded mpsc) ──► StatsWorker
//!                                               ├─ StatsCache (per-second buckets)
//!                                               └─ flush ──► CounterStore (TTL'd keys)
//! ```

mod cache;
mod config;
mod event;
mod keys;
mod logger;

pub use cache::StatsCache;
pub use config::StatsConfig;
pub use event::StatEvent;
pub use keys::StatKeys;
pub use logger::{StatsError, StatsLogger};
