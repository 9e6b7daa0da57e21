use chrono::Utc;
use std::sync::Arc;

use crate::event::LogEvent;
use crate::extract::{is_collection_field, FieldExtractor};
use crate::flatten::flatten;
use crate::host;
use crate::message::{Item, OutboundMessage, Severity};
use crate::template::FormatProvider;

/// Turns [`LogEvent`]s into [`OutboundMessage`]s.
///
/// The machine name is resolved once at construction and reused for every
/// message.
#[derive(Clone)]
pub struct MessageBuilder {
    application: Option<String>,
    format_provider: Option<Arc<dyn FormatProvider>>,
    machine_name: Option<String>,
}

impl MessageBuilder {
    pub fn new(application: Option<String>, format_provider: Option<Arc<dyn FormatProvider>>) -> Self {
        MessageBuilder {
            application,
            format_provider,
            machine_name: host::machine_name(),
        }
    }

    /// Override the detected machine name.
    pub fn with_machine_name(mut self, machine_name: Option<String>) -> Self {
        self.machine_name = machine_name;
        self
    }

    /// One message per event, in batch order.
    pub fn build_batch(&self, events: &[LogEvent]) -> Vec<OutboundMessage> {
        events.iter().map(|e| self.build(e)).collect()
    }

    pub fn build(&self, event: &LogEvent) -> OutboundMessage {
        let fields = FieldExtractor::new(event, self.application.as_deref(), self.machine_name.as_deref());

        OutboundMessage {
            title: event.template.render(&event.properties, self.format_provider.as_deref()),
            title_template: Some(event.template.text().to_string()),
            severity: Severity::from(event.level),
            date_time: event.timestamp.with_timezone(&Utc),
            detail: event.exception.as_ref().map(|e| e.to_string()),
            data: data_items(event),
            type_name: fields.type_name(),
            hostname: fields.hostname(),
            application: fields.application(),
            user: fields.user(),
            source: fields.source(),
            method: fields.method(),
            version: fields.version(),
            url: fields.url(),
            status_code: fields.status_code(),
            correlation_id: fields.correlation_id(),
            category: fields.category(),
            server_variables: fields.server_variables(),
            cookies: fields.cookies(),
            form: fields.form(),
            query_string: fields.query_string(),
        }
    }
}

// Exception data first, then every property except the ones promoted to
// the HTTP collections.
fn data_items(event: &LogEvent) -> Vec<Item> {
    let mut data: Vec<Item> = event
        .exception
        .iter()
        .flat_map(|e| e.data_items())
        .map(|(k, v)| Item::new(k, Some(v)))
        .collect();

    for (name, value) in event.properties.iter() {
        if is_collection_field(name) {
            continue;
        }
        data.extend(flatten(name, Some(value)));
    }
    data
}
