//! In-process queue with lifecycle hooks.
//!
//! Stand-in for an external queue backend, used by the integration tests
//! and the demo binary. Items are opaque strings; what matters for the
//! relay is that every mutation fires the matching hook and that `size()`
//! reflects the net length at the moment it is asked.

use super::{HookHandler, HookKind, QueueEvent, StatSource};
use crate::store::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

pub struct MemoryQueue {
    name: String,
    items: Mutex<VecDeque<String>>,
    handlers: Mutex<HashMap<HookKind, Vec<HookHandler>>>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryQueue {
            name: name.into(),
            items: Mutex::new(VecDeque::new()),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    pub async fn push(&self, item: impl Into<String>) {
        self.items.lock().push_back(item.into());
        self.fire(QueueEvent::Push).await;
    }

    pub async fn multi_push(&self, items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        let n = items.len() as u64;
        {
            let mut queue = self.items.lock();
            for item in items {
                queue.push_back(item);
            }
        }
        self.fire(QueueEvent::MultiPush(n)).await;
    }

    pub async fn pop(&self) -> Option<String> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.fire(QueueEvent::Pop).await;
        }
        item
    }

    pub async fn multi_pop(&self, max: usize) -> Vec<String> {
        let taken: Vec<String> = {
            let mut queue = self.items.lock();
            let n = max.min(queue.len());
            queue.drain(..n).collect()
        };
        if !taken.is_empty() {
            self.fire(QueueEvent::MultiPop(taken.len() as u64)).await;
        }
        taken
    }

    /// Acknowledge a previously popped item.
    pub async fn ack(&self, _item: &str) {
        self.fire(QueueEvent::Ack).await;
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    async fn fire(&self, event: QueueEvent) {
        // Snapshot handlers so the lock is not held across awaits.
        let handlers: Vec<HookHandler> = self
            .handlers
            .lock()
            .get(&event.kind())
            .map(|hs| hs.to_vec())
            .unwrap_or_default();

        for handler in handlers {
            handler(event).await;
        }
    }
}

#[async_trait]
impl StatSource for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn size(&self) -> Result<i64, StoreError> {
        Ok(self.items.lock().len() as i64)
    }

    fn register(&self, kind: HookKind, handler: HookHandler) {
        self.handlers.lock().entry(kind).or_default().push(handler);
    }
}
