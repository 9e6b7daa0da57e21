use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::client::ElmahIoApi;
use crate::error::{ConfigError, DeliveryError};
use crate::installation::CreateInstallation;
use crate::message::OutboundMessage;

/// Client-side timeout applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`HttpApi`].
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Base URL without path, e.g. "https://api.elmah.io"
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        HttpConfig {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// elmah.io implementation of [`ElmahIoApi`] over HTTPS.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    config: HttpConfig,
}

impl HttpApi {
    /// Construct a new API client.
    ///
    /// **Parameters**
    /// - `config`: [`HttpConfig`] with base URL, API key and timeout.
    ///
    /// **Returns**
    /// - A ready-to-use [`HttpApi`], or a [`ConfigError`] when the key is
    ///   empty, the base URL is not absolute, or the TLS backend fails to
    ///   initialize.
    pub fn new(config: HttpConfig) -> Result<Self, ConfigError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        if Url::parse(&config.base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl(config.base_url));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent())
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}?api_key={}",
            self.config.base_url.trim_end_matches('/'),
            path,
            urlencoding::encode(&self.config.api_key)
        )
    }

    pub(crate) fn messages_endpoint(&self, log_id: Uuid) -> String {
        self.endpoint(&format!("v3/messages/{}/_bulk", log_id))
    }

    pub(crate) fn installations_endpoint(&self, log_id: Uuid) -> String {
        self.endpoint(&format!("v3/installations/{}", log_id))
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, payload: &T) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(payload)?;
        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout(self.config.timeout)
                } else {
                    DeliveryError::Http(e)
                }
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(DeliveryError::Status { status, body })
        }
    }
}

/// `User-Agent` sent with every request.
pub fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[async_trait]
impl ElmahIoApi for HttpApi {
    async fn create_bulk_and_notify(
        &self,
        log_id: Uuid,
        messages: &[OutboundMessage],
    ) -> Result<(), DeliveryError> {
        self.post_json(&self.messages_endpoint(log_id), messages).await
    }

    async fn create_installation(
        &self,
        log_id: Uuid,
        installation: &CreateInstallation,
    ) -> Result<(), DeliveryError> {
        self.post_json(&self.installations_endpoint(log_id), installation).await
    }
}
