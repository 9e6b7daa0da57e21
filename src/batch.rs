//! Time- and size-bounded batching of log events.
//!
//! Producers append to a single locked buffer. A background task wakes up
//! every `period` or as soon as a full batch is buffered, swaps out up to
//! `batch_size_limit` events at a time and submits them through
//! [`Delivery`]. Every flush path goes through [`BatchingEngine::drain`],
//! which is serialized so batches leave in buffer order.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

use crate::builder::MessageBuilder;
use crate::client::ElmahIoApi;
use crate::error::DeliveryError;
use crate::event::LogEvent;
use crate::hooks::MessageHooks;
use crate::SELF_LOG_TARGET;

/// Counters maintained by the sink.
#[derive(Debug, Default)]
pub struct SinkStats {
    /// Events accepted into the buffer.
    pub emitted: AtomicU64,
    /// Events dropped because the buffer was full or the sink was closed.
    pub dropped: AtomicU64,
    /// Messages removed by the filter callback.
    pub filtered: AtomicU64,
    pub submitted_batches: AtomicU64,
    pub submitted_messages: AtomicU64,
    pub failed_batches: AtomicU64,
}

/// Point-in-time copy of [`SinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub emitted: u64,
    pub dropped: u64,
    pub filtered: u64,
    pub submitted_batches: u64,
    pub submitted_messages: u64,
    pub failed_batches: u64,
}

impl SinkStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            emitted: self.emitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            submitted_batches: self.submitted_batches.load(Ordering::Relaxed),
            submitted_messages: self.submitted_messages.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
        }
    }
}

/// Converts a swapped-out batch into messages and submits it.
pub struct Delivery {
    pub api: Arc<dyn ElmahIoApi>,
    pub log_id: Uuid,
    pub builder: MessageBuilder,
    pub hooks: MessageHooks,
    pub submit_timeout: Duration,
}

impl Delivery {
    /// Build, filter and submit one batch. Failures are reported to the
    /// diagnostic target and the error callback, never returned.
    async fn submit(&self, events: Vec<LogEvent>, stats: &SinkStats) {
        let built = self.builder.build_batch(&events);
        let total = built.len();
        let messages = self.hooks.admit_all(built);
        stats
            .filtered
            .fetch_add((total - messages.len()) as u64, Ordering::Relaxed);

        if messages.is_empty() {
            debug!(target: SELF_LOG_TARGET, "all {} messages filtered, nothing to send", total);
            return;
        }

        let result = match timeout(
            self.submit_timeout,
            self.api.create_bulk_and_notify(self.log_id, &messages),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.submit_timeout)),
        };

        match result {
            Ok(()) => {
                stats.submitted_batches.fetch_add(1, Ordering::Relaxed);
                stats
                    .submitted_messages
                    .fetch_add(messages.len() as u64, Ordering::Relaxed);
                debug!(target: SELF_LOG_TARGET, "sent batch of {} messages", messages.len());
            }
            Err(e) => {
                stats.failed_batches.fetch_add(1, Ordering::Relaxed);
                error!(
                    target: SELF_LOG_TARGET,
                    "failed to send batch of {} messages: {}",
                    messages.len(),
                    e
                );
                self.hooks.report_failure(&messages, &e);
            }
        }
    }
}

/// Limits for [`BatchingEngine`].
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub batch_size_limit: usize,
    pub period: Duration,
    pub queue_limit: usize,
}

/// Shared buffer plus the flush machinery around it.
pub struct BatchingEngine {
    buffer: Mutex<Vec<LogEvent>>,
    wake: Notify,
    flush_lock: tokio::sync::Mutex<()>,
    config: BatchConfig,
    delivery: Delivery,
    stats: Arc<SinkStats>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl BatchingEngine {
    /// Create the engine and spawn its timer task on the current runtime.
    ///
    /// Minimal thresholds are enforced for `batch_size_limit` and
    /// `queue_limit`; the caller validates `period`.
    pub fn start(config: BatchConfig, delivery: Delivery, stats: Arc<SinkStats>) -> (Arc<Self>, JoinHandle<()>) {
        let config = BatchConfig {
            batch_size_limit: config.batch_size_limit.max(1),
            queue_limit: config.queue_limit.max(config.batch_size_limit.max(1)),
            period: config.period,
        };

        let engine = Arc::new(BatchingEngine {
            buffer: Mutex::new(Vec::with_capacity(config.batch_size_limit)),
            wake: Notify::new(),
            flush_lock: tokio::sync::Mutex::new(()),
            config,
            delivery,
            stats,
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        });

        let handle = tokio::spawn(Arc::clone(&engine).run());
        (engine, handle)
    }

    /// Append an event. Never blocks on I/O; returns `false` when the event
    /// was dropped.
    pub fn enqueue(&self, event: LogEvent) -> bool {
        let full = {
            // `closed` is only set under this lock, so nothing lands in the
            // buffer after the final drain.
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            if self.closed.load(Ordering::Acquire) {
                drop(buffer);
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            if buffer.len() >= self.config.queue_limit {
                drop(buffer);
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(target: SELF_LOG_TARGET, "buffer full, dropping log event");
                return false;
            }
            buffer.push(event);
            buffer.len() >= self.config.batch_size_limit
        };

        self.stats.emitted.fetch_add(1, Ordering::Relaxed);
        if full {
            self.wake.notify_one();
        }
        true
    }

    /// Number of events waiting to be sent.
    pub fn pending(&self) -> usize {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Send everything buffered right now.
    pub async fn flush(self: &Arc<Self>) {
        self.drain(false).await;
    }

    /// Stop the timer task; it performs a final flush before exiting.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // Swap-and-submit shared by every trigger. With `only_full`, a trailing
    // partial batch stays buffered for the next tick. Each batch runs on its
    // own task so a panicking callback or client loses only that batch.
    async fn drain(self: &Arc<Self>, only_full: bool) {
        let _serial = self.flush_lock.lock().await;
        loop {
            let batch = self.take_batch(only_full);
            if batch.is_empty() {
                break;
            }
            let size = batch.len();
            let engine = Arc::clone(self);
            let submission = tokio::spawn(async move {
                engine.delivery.submit(batch, &engine.stats).await;
            });
            if let Err(e) = submission.await {
                self.stats.failed_batches.fetch_add(1, Ordering::Relaxed);
                error!(
                    target: SELF_LOG_TARGET,
                    "delivery of {} events aborted: {}",
                    size,
                    e
                );
            }
        }
    }

    fn take_batch(&self, only_full: bool) -> Vec<LogEvent> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let limit = self.config.batch_size_limit;
        if buffer.len() >= limit {
            return buffer.drain(..limit).collect();
        }
        if only_full || buffer.is_empty() {
            return Vec::new();
        }
        std::mem::take(&mut *buffer)
    }

    async fn run(self: Arc<Self>) {
        let period = self.config.period;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.drain(false).await,
                _ = self.wake.notified() => self.drain(true).await,
            }
        }

        {
            let _buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            self.closed.store(true, Ordering::Release);
        }
        debug!(target: SELF_LOG_TARGET, "sink closing, flushing {} pending events", self.pending());
        self.drain(false).await;
    }
}
