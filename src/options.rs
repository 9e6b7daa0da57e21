use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{ConfigError, DeliveryError};
use crate::event::Level;
use crate::hooks::{MessageHooks, OnError, OnFilter, OnMessage};
use crate::message::OutboundMessage;
use crate::template::FormatProvider;

pub const DEFAULT_BATCH_SIZE_LIMIT: usize = 50;
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(2);
pub const DEFAULT_QUEUE_LIMIT: usize = 100_000;
pub const DEFAULT_API_URL: &str = "https://api.elmah.io";

/// Minimum level that can be changed while the sink is running.
#[derive(Clone)]
pub struct LevelSwitch(Arc<AtomicU8>);

impl LevelSwitch {
    pub fn new(level: Level) -> Self {
        LevelSwitch(Arc::new(AtomicU8::new(level as u8)))
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.0.store(level as u8, Ordering::Relaxed);
    }
}

impl fmt::Debug for LevelSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LevelSwitch({})", self.level())
    }
}

/// Configuration for [`ElmahIoSink`](crate::sink::ElmahIoSink).
///
/// **Fields**
/// - `api_key`: key with the *Messages - Write* permission.
/// - `log_id`: target log.
/// - `batch_size_limit`: maximum messages per submitted batch.
/// - `period`: interval between timed flushes.
/// - `queue_limit`: events buffered before new ones are dropped.
/// - `minimum_level` / `level_switch`: events below either are ignored.
/// - `format_provider`: formatting hook used when rendering titles.
/// - `application`: fallback for the message `application` field.
/// - `api_url`: base URL of the HTTP API.
/// - `on_message` / `on_error` / `on_filter`: delivery callbacks.
#[derive(Clone)]
pub struct SinkOptions {
    pub api_key: String,
    pub log_id: Uuid,
    pub batch_size_limit: usize,
    pub period: Duration,
    pub queue_limit: usize,
    pub minimum_level: Option<Level>,
    pub level_switch: Option<LevelSwitch>,
    pub format_provider: Option<Arc<dyn FormatProvider>>,
    pub application: Option<String>,
    pub api_url: String,
    pub on_message: Option<OnMessage>,
    pub on_error: Option<OnError>,
    pub on_filter: Option<OnFilter>,
}

impl SinkOptions {
    pub fn new(api_key: impl Into<String>, log_id: Uuid) -> Self {
        SinkOptions {
            api_key: api_key.into(),
            log_id,
            batch_size_limit: DEFAULT_BATCH_SIZE_LIMIT,
            period: DEFAULT_PERIOD,
            queue_limit: DEFAULT_QUEUE_LIMIT,
            minimum_level: None,
            level_switch: None,
            format_provider: None,
            application: None,
            api_url: DEFAULT_API_URL.to_string(),
            on_message: None,
            on_error: None,
            on_filter: None,
        }
    }

    pub fn on_message(mut self, f: impl Fn(&mut OutboundMessage) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&OutboundMessage, &DeliveryError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_filter(mut self, f: impl Fn(&OutboundMessage) -> bool + Send + Sync + 'static) -> Self {
        self.on_filter = Some(Arc::new(f));
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size_limit == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(())
    }

    /// Whether an event at `level` passes both the static minimum and the
    /// switch.
    pub fn is_enabled(&self, level: Level) -> bool {
        let above_min = self.minimum_level.map_or(true, |min| level >= min);
        let above_switch = self.level_switch.as_ref().map_or(true, |s| level >= s.level());
        above_min && above_switch
    }

    pub fn hooks(&self) -> MessageHooks {
        MessageHooks {
            on_message: self.on_message.clone(),
            on_error: self.on_error.clone(),
            on_filter: self.on_filter.clone(),
        }
    }
}

impl fmt::Debug for SinkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkOptions")
            .field("api_key", &"<redacted>")
            .field("log_id", &self.log_id)
            .field("batch_size_limit", &self.batch_size_limit)
            .field("period", &self.period)
            .field("queue_limit", &self.queue_limit)
            .field("minimum_level", &self.minimum_level)
            .field("level_switch", &self.level_switch)
            .field("format_provider", &self.format_provider.as_ref().map(|p| p.name().to_string()))
            .field("application", &self.application)
            .field("api_url", &self.api_url)
            .field("hooks", &self.hooks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = SinkOptions::new("key", Uuid::nil());
        assert_eq!(options.batch_size_limit, 50);
        assert_eq!(options.period, Duration::from_secs(2));
        assert!(options.validate().is_ok());
        assert!(options.is_enabled(Level::Verbose));
    }

    #[test]
    fn rejects_degenerate_batching() {
        let mut options = SinkOptions::new("key", Uuid::nil());
        options.batch_size_limit = 0;
        assert!(matches!(options.validate(), Err(ConfigError::ZeroBatchSize)));

        let mut options = SinkOptions::new("key", Uuid::nil());
        options.period = Duration::ZERO;
        assert!(matches!(options.validate(), Err(ConfigError::ZeroPeriod)));
    }

    #[test]
    fn level_switch_changes_threshold_at_runtime() {
        let switch = LevelSwitch::new(Level::Warning);
        let mut options = SinkOptions::new("key", Uuid::nil());
        options.level_switch = Some(switch.clone());
        assert!(!options.is_enabled(Level::Information));

        switch.set_level(Level::Debug);
        assert!(options.is_enabled(Level::Information));

        options.minimum_level = Some(Level::Error);
        assert!(!options.is_enabled(Level::Warning));
    }

    #[test]
    fn debug_redacts_api_key() {
        let options = SinkOptions::new("secret-key", Uuid::nil());
        assert!(!format!("{:?}", options).contains("secret-key"));
    }
}
