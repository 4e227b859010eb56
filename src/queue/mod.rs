//! Producer Seam
//!
//! The relay consumes three things from the queue it observes: a name to
//! namespace keys under, a length snapshot taken at flush time, and
//! lifecycle hooks. Hooks are a closed set of typed event kinds rather than
//! string-dispatched callbacks, so an unhandled kind is a compile error.
//!
//! Hook handlers return a boxed future and the producer awaits them when an
//! event fires. That is what carries intake backpressure all the way out to
//! the producer: a full relay buffer suspends the handler, which suspends
//! the queue operation that fired it.

mod memory;

pub use memory::MemoryQueue;

use crate::store::StoreError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Closed set of producer lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Push,
    MultiPush,
    Pop,
    MultiPop,
    Ack,
}

/// Typed payload delivered to a hook handler. The multi variants carry the
/// batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    Push,
    MultiPush(u64),
    Pop,
    MultiPop(u64),
    Ack,
}

impl QueueEvent {
    pub fn kind(&self) -> HookKind {
        match self {
            QueueEvent::Push => HookKind::Push,
            QueueEvent::MultiPush(_) => HookKind::MultiPush,
            QueueEvent::Pop => HookKind::Pop,
            QueueEvent::MultiPop(_) => HookKind::MultiPop,
            QueueEvent::Ack => HookKind::Ack,
        }
    }

    /// Number of items the event accounts for.
    pub fn count(&self) -> i64 {
        match self {
            QueueEvent::Push | QueueEvent::Pop | QueueEvent::Ack => 1,
            QueueEvent::MultiPush(n) | QueueEvent::MultiPop(n) => *n as i64,
        }
    }
}

/// Handler installed for a hook kind. Awaited by the producer on fire.
pub type HookHandler = Arc<dyn Fn(QueueEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// A queue (or any other producer) the relay can observe.
#[async_trait]
pub trait StatSource: Send + Sync {
    /// Namespace for every key generated on behalf of this source.
    fn name(&self) -> &str;

    /// Current length snapshot, queried at flush time per bucket.
    async fn size(&self) -> Result<i64, StoreError>;

    /// Install `handler` for `kind` lifecycle events.
    fn register(&self, kind: HookKind, handler: HookHandler);
}
