use chrono::Utc;
use std::error::Error;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level as TracingLevel, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::event::{Level, LogEvent, Properties, PropertyValue};
use crate::exception::ExceptionInfo;
use crate::sink::ElmahIoSink;
use crate::template::MessageTemplate;

/// Targets whose events are never forwarded: this crate's own diagnostics
/// and the HTTP stack used to deliver them.
const IGNORED_TARGETS: [&str; 5] = ["elmahio_log_sink", "hyper", "reqwest", "h2", "rustls"];

/// `tracing_subscriber` layer that turns events into [`LogEvent`]s and
/// hands them to an [`ElmahIoSink`].
///
/// Fields of enclosing spans are included as properties (root span first,
/// event fields win on conflicts). The event target is recorded as
/// `SourceContext` unless the event sets one itself. Network I/O happens on
/// the sink's background task, never on the logging thread.
#[derive(Clone)]
pub struct ElmahIoLayer {
    sink: ElmahIoSink,
}

impl ElmahIoLayer {
    pub fn new(sink: ElmahIoSink) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &ElmahIoSink {
        &self.sink
    }
}

/// Map a `tracing` level onto the sink's levels.
pub fn map_level(level: &TracingLevel) -> Level {
    if *level == TracingLevel::ERROR {
        Level::Error
    } else if *level == TracingLevel::WARN {
        Level::Warning
    } else if *level == TracingLevel::INFO {
        Level::Information
    } else if *level == TracingLevel::DEBUG {
        Level::Debug
    } else {
        Level::Verbose
    }
}

fn is_ignored_target(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// Span fields stored in the span's extensions.
struct SpanFields(Properties);

impl<S> Layer<S> for ElmahIoLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(SpanFields(visitor.into_properties()));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);

        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(fields) => {
                for (name, value) in visitor.into_properties().iter() {
                    fields.0.insert(name, value.clone());
                }
            }
            None => extensions.insert(SpanFields(visitor.into_properties())),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_ignored_target(meta.target()) {
            return;
        }
        let level = map_level(meta.level());
        if !self.sink.is_enabled(level) {
            return;
        }

        let mut properties = Properties::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanFields>() {
                    for (name, value) in fields.0.iter() {
                        properties.insert(name, value.clone());
                    }
                }
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        for (name, value) in visitor.properties.iter() {
            properties.insert(name, value.clone());
        }
        if properties.get_ignore_case("SourceContext").is_none() {
            properties.insert("SourceContext", meta.target());
        }

        let record = LogEvent {
            timestamp: Utc::now().into(),
            level,
            template: MessageTemplate::literal(visitor.message.unwrap_or_default()),
            exception: visitor.exception,
            properties,
            identity: None,
        };

        self.sink.emit(record);
    }
}

/// Collects `tracing` fields into typed properties. The `message` field
/// and the first recorded error are kept apart.
#[derive(Default)]
pub struct FieldVisitor {
    pub properties: Properties,
    pub message: Option<String>,
    pub exception: Option<ExceptionInfo>,
}

impl FieldVisitor {
    // Spans have no title or exception slot, so both fold into properties.
    fn into_properties(mut self) -> Properties {
        if let Some(message) = self.message.take() {
            self.properties.insert("message", message);
        }
        if let Some(exception) = self.exception.take() {
            self.properties.insert("exception", exception.to_string());
        }
        self.properties
    }

    fn insert(&mut self, field: &Field, value: PropertyValue) {
        self.properties.insert(field.name(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, value.into());
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if self.exception.is_none() {
            self.exception = Some(ExceptionInfo::from_error(value));
        } else {
            self.insert(field, value.to_string().into());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, format!("{:?}", value).into());
        }
    }
}
