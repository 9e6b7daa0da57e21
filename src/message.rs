use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::event::Level;

/// Severity as understood by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::Verbose => Severity::Verbose,
            Level::Debug => Severity::Debug,
            Level::Warning => Severity::Warning,
            Level::Error => Severity::Error,
            Level::Fatal => Severity::Fatal,
            Level::Information => Severity::Information,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Verbose => "Verbose",
            Severity::Debug => "Debug",
            Severity::Information => "Information",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        };
        f.write_str(s)
    }
}

/// Key/value pair used by `data` and the HTTP collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub key: String,
    pub value: Option<String>,
}

impl Item {
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Item { key: key.into(), value }
    }
}

/// Payload for one message, serialized in the remote API's camelCase form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub title: String,
    pub title_template: Option<String>,
    pub severity: Severity,
    pub date_time: DateTime<Utc>,
    pub detail: Option<String>,
    pub data: Vec<Item>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub hostname: Option<String>,
    pub application: Option<String>,
    pub user: Option<String>,
    pub source: Option<String>,
    pub method: Option<String>,
    pub version: Option<String>,
    pub url: Option<String>,
    pub status_code: Option<i32>,
    pub correlation_id: Option<String>,
    pub category: Option<String>,
    pub server_variables: Vec<Item>,
    pub cookies: Vec<Item>,
    pub form: Vec<Item>,
    pub query_string: Vec<Item>,
}

impl OutboundMessage {
    /// Value of the first `data` entry named `key`.
    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|i| i.key == key)
            .and_then(|i| i.value.as_deref())
    }
}
