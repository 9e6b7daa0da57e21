use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;
use std::str::FromStr;

use crate::exception::ExceptionInfo;
use crate::template::MessageTemplate;

/// Severity of a [`LogEvent`], ordered from least to most important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Verbose,
        Level::Debug,
        Level::Information,
        Level::Warning,
        Level::Error,
        Level::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }

    pub(crate) fn from_u8(value: u8) -> Level {
        Level::ALL
            .get(value as usize)
            .copied()
            .unwrap_or(Level::Fatal)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name cannot be parsed.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Accepts the full names as well as the usual short aliases
    /// (`trace`, `info`, `warn`, `err`, `critical`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" | "trace" => Ok(Level::Verbose),
            "debug" => Ok(Level::Debug),
            "information" | "info" => Ok(Level::Information),
            "warning" | "warn" => Ok(Level::Warning),
            "error" | "err" => Ok(Level::Error),
            "fatal" | "critical" => Ok(Level::Fatal),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Primitive value carried by a property.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    DateTime(DateTime<FixedOffset>),
}

impl Scalar {
    /// String form of the underlying primitive, `None` for [`Scalar::Null`].
    pub fn raw_string(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
            Scalar::Int(i) => Some(i.to_string()),
            Scalar::UInt(u) => Some(u.to_string()),
            Scalar::Float(v) => Some(v.to_string()),
            Scalar::Str(s) => Some(s.clone()),
            Scalar::DateTime(dt) => Some(dt.to_rfc3339()),
        }
    }
}

impl fmt::Display for Scalar {
    /// Literal rendering: strings are quoted, null is `null`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                f.write_str("\"")
            }
            other => f.write_str(&other.raw_string().unwrap_or_default()),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(value.into())
                }
            }

            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    PropertyValue::Scalar(Scalar::$variant(value.into()))
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => UInt,
    u64 => UInt,
    f64 => Float,
    String => Str,
    &str => Str,
    DateTime<FixedOffset> => DateTime,
}

impl From<Scalar> for PropertyValue {
    fn from(value: Scalar) -> Self {
        PropertyValue::Scalar(value)
    }
}

/// Structured value of a property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(Scalar),
    Sequence(Vec<PropertyValue>),
    Structure {
        type_tag: Option<String>,
        properties: Vec<(String, PropertyValue)>,
    },
    Dictionary(Vec<(Scalar, PropertyValue)>),
}

impl PropertyValue {
    pub fn null() -> Self {
        PropertyValue::Scalar(Scalar::Null)
    }

    /// Build a dictionary from string keys.
    pub fn dictionary<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        PropertyValue::Dictionary(
            entries
                .into_iter()
                .map(|(k, v)| (Scalar::Str(k.into()), v.into()))
                .collect(),
        )
    }

    pub fn structure<N, V, I>(type_tag: Option<&str>, properties: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<PropertyValue>,
    {
        PropertyValue::Structure {
            type_tag: type_tag.map(str::to_string),
            properties: properties
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Scalar(s) => write!(f, "{}", s),
            PropertyValue::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            PropertyValue::Structure { type_tag, properties } => {
                if let Some(tag) = type_tag {
                    write!(f, "{} ", tag)?;
                }
                f.write_str("{ ")?;
                for (i, (name, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str(" }")
            }
            PropertyValue::Dictionary(entries) => {
                f.write_str("[")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({}: {})", key, value)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Ordered property bag. Names are unique; inserting an existing name
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, PropertyValue)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Exact-name lookup, as used by template rendering.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// First property whose name matches `name` ignoring ASCII case.
    pub fn get_ignore_case(&self, name: &str) -> Option<(&str, &PropertyValue)> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(n, v)| (n.as_str(), v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N, V> FromIterator<(N, V)> for Properties
where
    N: Into<String>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (n, v) in iter {
            props.insert(n, v);
        }
        props
    }
}

/// One structured record produced by the logging front-end.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub level: Level,
    pub template: MessageTemplate,
    pub exception: Option<ExceptionInfo>,
    pub properties: Properties,
    /// Authenticated identity of the caller, used as the last fallback for
    /// the message `user` field.
    pub identity: Option<String>,
}

impl LogEvent {
    /// New event stamped with the current time and a parsed template.
    pub fn new(level: Level, template: &str) -> Self {
        LogEvent {
            timestamp: Utc::now().into(),
            level,
            template: MessageTemplate::parse(template),
            exception: None,
            properties: Properties::new(),
            identity: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name, value);
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }
}
