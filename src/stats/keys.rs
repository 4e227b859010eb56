//! Key construction for the counter store.
//!
//! Key formats, pinned here and nowhere else:
//!
//! - `<queue>:push` / `<queue>:pop` / `<queue>:ack` (metric names)
//! - `<metric>:<second>` (per-second counter key)
//! - `<queue>:size:<second>` (per-second queue length snapshot)

/// Builds every key kind the relay persists.
pub struct StatKeys;

impl StatKeys {
    /// Metric name for push events: `<queue>:push`
    pub fn push(queue: &str) -> String {
        format!("{}:push", queue)
    }

    /// Metric name for pop events: `<queue>:pop`
    pub fn pop(queue: &str) -> String {
        format!("{}:pop", queue)
    }

    /// Metric name for acknowledgements: `<queue>:ack`
    pub fn ack(queue: &str) -> String {
        format!("{}:ack", queue)
    }

    /// Counter key for a metric at a given second: `<metric>:<second>`
    pub fn at_second(metric: &str, sec: i64) -> String {
        format!("{}:{}", metric, sec)
    }

    /// Queue length snapshot key: `<queue>:size:<second>`
    pub fn queue_size(queue: &str, sec: i64) -> String {
        format!("{}:size:{}", queue, sec)
    }
}
