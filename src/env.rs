//! Environment variable names used by this crate for configuring the sink
//! from services without code changes.
//!
//! These are purely helpers; [`SinkOptions`] itself never reads the
//! environment unless [`SinkOptions::from_env`] is called.

use std::time::Duration;
use uuid::Uuid;

use crate::error::ConfigError;
use crate::event::Level;
use crate::options::SinkOptions;

/// API key with the *Messages - Write* permission. Required.
pub const ELMAHIO_API_KEY_ENV: &str = "ELMAHIO_API_KEY";

/// Target log id (UUID). Required.
pub const ELMAHIO_LOG_ID_ENV: &str = "ELMAHIO_LOG_ID";

/// Maximum messages per batch.
pub const ELMAHIO_BATCH_SIZE_ENV: &str = "ELMAHIO_BATCH_SIZE";

/// Flush period in milliseconds.
pub const ELMAHIO_PERIOD_MS_ENV: &str = "ELMAHIO_PERIOD_MS";

/// Minimum level, e.g. `Warning` or `warn`.
pub const ELMAHIO_MIN_LEVEL_ENV: &str = "ELMAHIO_MIN_LEVEL";

/// Application name used when events carry none.
pub const ELMAHIO_APPLICATION_ENV: &str = "ELMAHIO_APPLICATION";

/// Base URL of the API, for proxies and tests.
pub const ELMAHIO_API_URL_ENV: &str = "ELMAHIO_API_URL";

impl SinkOptions {
    /// Build options from the `ELMAHIO_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SinkOptions::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(ELMAHIO_API_KEY_ENV).ok_or(ConfigError::MissingEnv(ELMAHIO_API_KEY_ENV))?;
        let raw_log_id = get(ELMAHIO_LOG_ID_ENV).ok_or(ConfigError::MissingEnv(ELMAHIO_LOG_ID_ENV))?;
        let log_id = Uuid::parse_str(raw_log_id.trim()).map_err(|_| ConfigError::InvalidEnv {
            key: ELMAHIO_LOG_ID_ENV,
            value: raw_log_id.clone(),
        })?;

        let mut options = SinkOptions::new(api_key, log_id);

        if let Some(raw) = get(ELMAHIO_BATCH_SIZE_ENV) {
            options.batch_size_limit = parse(ELMAHIO_BATCH_SIZE_ENV, &raw)?;
        }
        if let Some(raw) = get(ELMAHIO_PERIOD_MS_ENV) {
            options.period = Duration::from_millis(parse(ELMAHIO_PERIOD_MS_ENV, &raw)?);
        }
        if let Some(raw) = get(ELMAHIO_MIN_LEVEL_ENV) {
            options.minimum_level = Some(parse::<Level>(ELMAHIO_MIN_LEVEL_ENV, &raw)?);
        }
        options.application = get(ELMAHIO_APPLICATION_ENV);
        if let Some(url) = get(ELMAHIO_API_URL_ENV) {
            options.api_url = url;
        }

        options.validate()?;
        Ok(options)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: raw.to_string(),
    })
}
