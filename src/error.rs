use std::error::Error;
use std::time::Duration;

/// Invalid or missing sink configuration, reported before any event is
/// processed.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,

    #[error("batch size limit must be greater than zero")]
    ZeroBatchSize,

    #[error("batch period must be greater than zero")]
    ZeroPeriod,

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(String),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failure while submitting a batch or registering an installation.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("elmah.io responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Client(Box<dyn Error + Send + Sync>),
}

impl DeliveryError {
    /// Wrap an error raised by a custom [`ElmahIoApi`](crate::client::ElmahIoApi).
    pub fn client(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        DeliveryError::Client(err.into())
    }
}

/// Error returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}
