//! Stats Relay Worker and Handle
//!
//! One worker task per logger instance drains the bounded intake channel in
//! arrival order, folds each event into the per-second cache, and runs the
//! flush executor inline whenever the flush policy fires. Keeping flush on
//! the worker serializes cache mutation and bucket eviction without any
//! locking; producers only ever touch the channel.
//!
//! ```text
//! producer 1 ──┐
//! producer 2 ──┤──► intake ──► StatsWorker ──► cache ──► flush ──► store
//! hooks      ──┘
//! ```
//!
//! Failed store writes are logged, counted, skipped, and never retried.
//! The bucket is evicted either way; a permanently failing store leaks no
//! memory but silently loses that second's data.

use crate::queue::{HookHandler, HookKind, QueueEvent, StatSource};
use crate::stats::cache::{StatsCache, GRACE_SECS};
use crate::stats::config::StatsConfig;
use crate::stats::event::StatEvent;
use crate::stats::keys::StatKeys;
use crate::store::CounterStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Error type for logger operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsError {
    /// Intake is closed; the logger has been destroyed
    Closed,
    /// `bind()` was already called on this logger
    AlreadyBound,
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::Closed => write!(f, "stats intake is closed"),
            StatsError::AlreadyBound => write!(f, "logger is already bound to its source"),
        }
    }
}

impl std::error::Error for StatsError {}

/// Messages for the relay worker
enum StatsMessage {
    /// Fold one event into the cache, then evaluate the flush policy
    Log(StatEvent),
    /// Terminal flush past the grace window, then stop
    Shutdown { response_tx: oneshot::Sender<()> },
}

/// Worker task owning the cache and the store connection
struct StatsWorker {
    rx: mpsc::Receiver<StatsMessage>,
    cache: StatsCache,
    store: Box<dyn CounterStore>,
    source: Arc<dyn StatSource>,
    ttl_secs: u64,
    dropped_writes: Arc<AtomicU64>,
}

impl StatsWorker {
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                StatsMessage::Log(event) => {
                    let now = epoch_now();
                    self.cache.record(&event.name, event.delta, now);
                    if self.cache.should_flush(now) {
                        self.flush(now).await;
                    }
                }
                StatsMessage::Shutdown { response_tx } => {
                    // Advance the horizon past the grace window so every
                    // resident bucket drains.
                    self.flush(epoch_now() + GRACE_SECS).await;
                    info!("stats worker shutting down");
                    let _ = response_tx.send(());
                    break;
                }
            }
        }
    }

    /// Flush executor: drain every bucket outside the grace window, write
    /// its counters and one queue-size snapshot, then advance the
    /// watermark. Store failures skip that write and move on.
    async fn flush(&mut self, now: i64) {
        self.cache.begin_flush();

        for (sec, counters) in self.cache.take_flushable(now) {
            for (name, value) in counters {
                let key = StatKeys::at_second(&name, sec);
                if let Err(e) = self.store.incr_by_expire(&key, value, self.ttl_secs).await {
                    self.dropped_writes.fetch_add(1, Ordering::Relaxed);
                    error!("unable to increment flushed stat {}: {}", key, e);
                }
            }

            // Queue length snapshot, written independently of the counters.
            let size_key = StatKeys::queue_size(self.source.name(), sec);
            match self.source.size().await {
                Ok(size) => {
                    if let Err(e) = self.store.set_with_ttl(&size_key, size, self.ttl_secs).await {
                        self.dropped_writes.fetch_add(1, Ordering::Relaxed);
                        error!("unable to record queue size {}: {}", size_key, e);
                    }
                }
                Err(e) => {
                    self.dropped_writes.fetch_add(1, Ordering::Relaxed);
                    error!("unable to read queue size for {}: {}", size_key, e);
                }
            }
        }

        self.cache.end_flush(now);
    }
}

/// Handle for logging stats against a source and flushing them to a
/// counter store.
///
/// Construction spawns the worker; `bind()` wires the source's lifecycle
/// hooks to `log()`; `destroy()` force-flushes everything still resident
/// and closes the intake for good.
pub struct StatsLogger {
    tx: mpsc::Sender<StatsMessage>,
    source: Arc<dyn StatSource>,
    bound: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped_writes: Arc<AtomicU64>,
}

impl StatsLogger {
    pub fn new(
        source: Arc<dyn StatSource>,
        store: Box<dyn CounterStore>,
        config: StatsConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let dropped_writes = Arc::new(AtomicU64::new(0));

        let worker = StatsWorker {
            rx,
            cache: StatsCache::new(),
            store,
            source: Arc::clone(&source),
            ttl_secs: config.stats_ttl_secs,
            dropped_writes: Arc::clone(&dropped_writes),
        };
        let handle = tokio::spawn(worker.run());

        StatsLogger {
            tx,
            source,
            bound: AtomicBool::new(false),
            worker: Mutex::new(Some(handle)),
            dropped_writes,
        }
    }

    /// Log a stat. Suspends while the intake buffer is full (backpressure),
    /// returns once the event is enqueued. Callable by anyone, not only by
    /// bound hooks; the name is taken as-is.
    pub async fn log(&self, name: impl Into<String>, delta: i64) -> Result<(), StatsError> {
        self.tx
            .send(StatsMessage::Log(StatEvent::new(name, delta)))
            .await
            .map_err(|_| StatsError::Closed)
    }

    /// Bind to all of the source's lifecycle hooks. One-shot: a second call
    /// fails instead of double-subscribing.
    pub fn bind(&self) -> Result<(), StatsError> {
        if self.bound.swap(true, Ordering::SeqCst) {
            return Err(StatsError::AlreadyBound);
        }

        let queue = self.source.name();
        let table = [
            (HookKind::Push, StatKeys::push(queue)),
            (HookKind::MultiPush, StatKeys::push(queue)),
            (HookKind::Pop, StatKeys::pop(queue)),
            (HookKind::MultiPop, StatKeys::pop(queue)),
            (HookKind::Ack, StatKeys::ack(queue)),
        ];

        for (kind, key) in table {
            let tx = self.tx.clone();
            let handler: HookHandler = Arc::new(move |event: QueueEvent| {
                let tx = tx.clone();
                let key = key.clone();
                Box::pin(async move {
                    let stat = StatsMessage::Log(StatEvent::new(key, event.count()));
                    if tx.send(stat).await.is_err() {
                        warn!("stat intake closed; dropping {:?} hook event", event.kind());
                    }
                })
            });
            self.source.register(kind, handler);
        }

        Ok(())
    }

    /// Flush every resident bucket, close the intake, and release the
    /// store. Terminal: any later `log()` fails with `StatsError::Closed`.
    /// Calling it again is a no-op.
    pub async fn destroy(&self) {
        let handle = self.worker.lock().take();
        let Some(handle) = handle else {
            return;
        };

        let (response_tx, response_rx) = oneshot::channel();
        if self
            .tx
            .send(StatsMessage::Shutdown { response_tx })
            .await
            .is_ok()
        {
            let _ = response_rx.await;
        }
        let _ = handle.await;
    }

    /// Number of store writes dropped so far (failed counter increments,
    /// failed or unreadable size snapshots). Loss is fire-and-forget by
    /// design; this counter is the only trace it leaves.
    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes.load(Ordering::Relaxed)
    }
}

fn epoch_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before Unix epoch")
        .as_secs() as i64
}
