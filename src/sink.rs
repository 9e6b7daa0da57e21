use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::batch::{BatchConfig, BatchingEngine, Delivery, SinkStats, StatsSnapshot};
use crate::builder::MessageBuilder;
use crate::client::ElmahIoApi;
use crate::error::ConfigError;
use crate::event::LogEvent;
use crate::http::{HttpApi, HttpConfig, REQUEST_TIMEOUT};
use crate::installation::CreateInstallation;
use crate::options::SinkOptions;
use crate::SELF_LOG_TARGET;

/// Batched, failure-isolated delivery of [`LogEvent`]s to elmah.io.
///
/// Cloning is cheap; all clones feed the same buffer. When the last clone
/// is dropped the background task flushes what is left and exits.
#[derive(Clone)]
pub struct ElmahIoSink {
    inner: Arc<SinkInner>,
}

struct SinkInner {
    options: SinkOptions,
    engine: Arc<BatchingEngine>,
    stats: Arc<SinkStats>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for SinkInner {
    fn drop(&mut self) {
        self.engine.close();
    }
}

impl ElmahIoSink {
    /// Create a sink that talks to the elmah.io HTTP API.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// **Returns**
    /// - `Err(ConfigError)` for an empty API key, an invalid base URL or
    ///   degenerate batching limits.
    pub fn new(options: SinkOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let api = HttpApi::new(HttpConfig::new(options.api_url.clone(), options.api_key.clone()))?;
        Self::with_client(options, Arc::new(api))
    }

    /// Create a sink on top of an existing API client.
    ///
    /// Must be called from within a Tokio runtime. Registers the
    /// installation once in the background; failures there are only logged.
    pub fn with_client(options: SinkOptions, api: Arc<dyn ElmahIoApi>) -> Result<Self, ConfigError> {
        options.validate()?;

        let stats = Arc::new(SinkStats::default());
        let delivery = Delivery {
            api: Arc::clone(&api),
            log_id: options.log_id,
            builder: MessageBuilder::new(options.application.clone(), options.format_provider.clone()),
            hooks: options.hooks(),
            submit_timeout: REQUEST_TIMEOUT,
        };
        let (engine, task) = BatchingEngine::start(
            BatchConfig {
                batch_size_limit: options.batch_size_limit,
                period: options.period,
                queue_limit: options.queue_limit,
            },
            delivery,
            Arc::clone(&stats),
        );

        register_installation(api, &options);

        Ok(ElmahIoSink {
            inner: Arc::new(SinkInner {
                options,
                engine,
                stats,
                task: Mutex::new(Some(task)),
            }),
        })
    }

    /// Queue one event. Synchronous and never fails; events below the
    /// configured levels, or arriving after shutdown, are dropped.
    pub fn emit(&self, event: LogEvent) {
        if !self.inner.options.is_enabled(event.level) {
            return;
        }
        self.inner.engine.enqueue(event);
    }

    /// Whether an event at `level` would be accepted.
    pub fn is_enabled(&self, level: crate::event::Level) -> bool {
        self.inner.options.is_enabled(level)
    }

    /// Submit everything currently buffered.
    pub async fn flush(&self) {
        self.inner.engine.flush().await;
    }

    /// Stop the timer, flush what is left and wait for the background task.
    /// Later calls return immediately.
    pub async fn shutdown(&self) {
        self.inner.engine.close();
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(target: SELF_LOG_TARGET, "sink task ended abnormally: {}", e);
            }
        }
    }

    pub fn options(&self) -> &SinkOptions {
        &self.inner.options
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Events buffered and not yet submitted.
    pub fn pending(&self) -> usize {
        self.inner.engine.pending()
    }
}

fn register_installation(api: Arc<dyn ElmahIoApi>, options: &SinkOptions) {
    let installation = CreateInstallation::from_options(options);
    let log_id = options.log_id;
    tokio::spawn(async move {
        match api.create_installation(log_id, &installation).await {
            Ok(()) => debug!(target: SELF_LOG_TARGET, "registered installation"),
            Err(e) => warn!(target: SELF_LOG_TARGET, "failed to create installation: {}", e),
        }
    });
}
