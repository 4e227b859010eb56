pub mod queue;
pub mod stats;
pub mod store;

pub use queue::{HookKind, QueueEvent, StatSource};
pub use stats::{StatsConfig, StatsError, StatsLogger};
pub use store::{CounterStore, StoreError};
