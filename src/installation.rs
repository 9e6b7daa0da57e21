use serde::Serialize;

use crate::message::Item;
use crate::options::SinkOptions;

pub const LOGGER_TYPE: &str = "elmahio-log-sink";

/// Client identity registered with the log when a sink starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstallation {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
    pub loggers: Vec<LoggerInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Vec<Item>,
    pub assemblies: Vec<AssemblyInfo>,
    pub config_files: Vec<ConfigFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblyInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub name: String,
    pub content: String,
    pub content_type: String,
}

impl CreateInstallation {
    /// Describe this sink and its effective configuration.
    pub fn from_options(options: &SinkOptions) -> Self {
        let text = |v: Option<String>| Some(v.unwrap_or_default());

        let logger = LoggerInfo {
            kind: LOGGER_TYPE.to_string(),
            properties: vec![
                Item::new(
                    "FormatProvider",
                    text(options.format_provider.as_ref().map(|p| p.name().to_string())),
                ),
                Item::new("BatchPostingLimit", Some(options.batch_size_limit.to_string())),
                Item::new(
                    "LevelSwitch",
                    text(options.level_switch.as_ref().map(|s| s.level().to_string())),
                ),
                Item::new(
                    "MinimumLogEventLevel",
                    text(options.minimum_level.map(|l| l.to_string())),
                ),
                Item::new("Period", Some(format!("{:?}", options.period))),
            ],
            assemblies: vec![AssemblyInfo {
                name: LOGGER_TYPE.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            }],
            config_files: Vec::new(),
        };

        CreateInstallation {
            kind: "rust".to_string(),
            name: options.application.clone(),
            loggers: vec![logger],
        }
    }
}
