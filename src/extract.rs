//! Extraction of well-known message fields from a [`LogEvent`].
//!
//! Every lookup is total: a missing property, an unexpected value kind or
//! an unparsable URL all resolve to `None` (or an empty list) and the next
//! fallback in the chain is tried.

use reqwest::Url;

use crate::event::{LogEvent, PropertyValue};
use crate::flatten::flatten_to_string;
use crate::message::Item;

/// Raw request properties written by HTTP request enrichers.
pub const HTTP_REQUEST_TYPE: &str = "HttpRequestType";
pub const HTTP_REQUEST_URL: &str = "HttpRequestUrl";
pub const HTTP_REQUEST_USER_AGENT: &str = "HttpRequestUserAgent";
pub const HTTP_REQUEST_CLIENT_HOST_IP: &str = "HttpRequestClientHostIP";

/// Property names whose dictionary values are promoted to dedicated
/// message collections.
pub const COLLECTION_FIELDS: [&str; 4] = ["servervariables", "cookies", "form", "querystring"];

const CLIENT_IP_KEYS: [&str; 4] = ["CLIENT-IP", "CLIENT_IP", "HTTP-CLIENT-IP", "HTTP_CLIENT_IP"];

/// Field lookups over one event plus the static fallbacks that do not come
/// from the event itself.
pub struct FieldExtractor<'a> {
    event: &'a LogEvent,
    application: Option<&'a str>,
    machine_name: Option<&'a str>,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(event: &'a LogEvent, application: Option<&'a str>, machine_name: Option<&'a str>) -> Self {
        FieldExtractor { event, application, machine_name }
    }

    /// Case-insensitive property lookup flattened to a single string.
    pub fn string(&self, name: &str) -> Option<String> {
        self.event
            .properties
            .get_ignore_case(name)
            .map(|(key, value)| flatten_to_string(key, value))
    }

    fn non_blank(&self, name: &str) -> Option<String> {
        self.string(name).filter(|s| !s.trim().is_empty())
    }

    pub fn hostname(&self) -> Option<String> {
        self.non_blank("hostname")
            .or_else(|| self.machine_name.map(str::to_string))
    }

    pub fn user(&self) -> Option<String> {
        self.non_blank("user")
            .or_else(|| self.non_blank("UserName"))
            .or_else(|| self.event.identity.clone().filter(|s| !s.trim().is_empty()))
    }

    pub fn type_name(&self) -> Option<String> {
        self.non_blank("type")
            .or_else(|| self.event.exception.as_ref().map(|e| e.base().type_name.clone()))
    }

    pub fn source(&self) -> Option<String> {
        self.non_blank("source")
            .or_else(|| self.event.exception.as_ref().and_then(|e| e.base().source.clone()))
    }

    pub fn method(&self) -> Option<String> {
        self.non_blank("method").or_else(|| {
            self.non_blank(HTTP_REQUEST_TYPE)
                .filter(|m| is_relative_reference(m))
        })
    }

    pub fn version(&self) -> Option<String> {
        self.string("version")
    }

    pub fn url(&self) -> Option<String> {
        self.non_blank("url").or_else(|| self.request_url().map(|u| u.path().to_string()))
    }

    pub fn application(&self) -> Option<String> {
        self.non_blank("application")
            .or_else(|| self.application.map(str::to_string))
    }

    pub fn category(&self) -> Option<String> {
        self.non_blank("category").or_else(|| self.string("sourcecontext"))
    }

    pub fn correlation_id(&self) -> Option<String> {
        self.string("correlationid")
    }

    pub fn status_code(&self) -> Option<i32> {
        self.non_blank("statuscode")?.trim().parse().ok()
    }

    /// Elements of a dictionary-valued property; any other value kind
    /// yields an empty list.
    pub fn items(&self, name: &str) -> Vec<Item> {
        match self.event.properties.get_ignore_case(name) {
            Some((_, PropertyValue::Dictionary(entries))) => entries
                .iter()
                .map(|(key, value)| Item::new(key.raw_string().unwrap_or_default(), element_value(value)))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn server_variables(&self) -> Vec<Item> {
        let mut vars = self.items("servervariables");

        if !vars.iter().any(|v| v.key.eq_ignore_ascii_case("User-Agent")) {
            if let Some(agent) = self.non_blank(HTTP_REQUEST_USER_AGENT) {
                vars.push(Item::new("User-Agent", Some(agent)));
            }
        }

        let has_client_ip = vars
            .iter()
            .any(|v| CLIENT_IP_KEYS.iter().any(|k| v.key.eq_ignore_ascii_case(k)));
        if !has_client_ip {
            if let Some(ip) = self.non_blank(HTTP_REQUEST_CLIENT_HOST_IP) {
                vars.push(Item::new("Client-IP", Some(ip)));
            }
        }

        vars
    }

    pub fn cookies(&self) -> Vec<Item> {
        self.items("cookies")
    }

    pub fn form(&self) -> Vec<Item> {
        self.items("form")
    }

    pub fn query_string(&self) -> Vec<Item> {
        let direct = self.items("querystring");
        if !direct.is_empty() {
            return direct;
        }

        let Some(url) = self.request_url() else {
            return direct;
        };
        match url.query() {
            Some(query) if !query.trim().is_empty() => parse_query(query),
            _ => direct,
        }
    }

    fn request_url(&self) -> Option<Url> {
        let raw = self.non_blank(HTTP_REQUEST_URL)?;
        Url::parse(raw.trim()).ok()
    }
}

fn element_value(value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::Scalar(scalar) => scalar.raw_string(),
        other => Some(other.to_string()).filter(|s| !s.trim().is_empty()),
    }
}

/// Split a raw query on `&`, then each pair on its first `=`.
pub fn parse_query(query: &str) -> Vec<Item> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => Item::new(key, Some(value.to_string())),
            None => Item::new(pair, None),
        })
        .collect()
}

// A token such as `GET` is a valid relative reference; anything that
// parses as an absolute URL or contains whitespace is not.
fn is_relative_reference(token: &str) -> bool {
    if token.chars().any(char::is_whitespace) || Url::parse(token).is_ok() {
        return false;
    }
    Url::parse("http://localhost/")
        .and_then(|base| base.join(token))
        .is_ok()
}

/// `true` when `name` is promoted to one of the HTTP collections.
pub fn is_collection_field(name: &str) -> bool {
    COLLECTION_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(name))
}
