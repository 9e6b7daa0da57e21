mod common;

use std::fmt;

use common::RecordingApi;
use elmahio_log_sink::layer::ElmahIoLayer;
use elmahio_log_sink::{ElmahIoSink, Level, Severity, SinkOptions, SELF_LOG_TARGET};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;
use uuid::Uuid;

#[derive(Debug)]
struct ConnectionReset;

impl fmt::Display for ConnectionReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection reset")
    }
}

impl std::error::Error for ConnectionReset {}

#[derive(Debug)]
struct PaymentFailed {
    cause: ConnectionReset,
}

impl fmt::Display for PaymentFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("payment failed")
    }
}

impl std::error::Error for PaymentFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

fn sink(api: std::sync::Arc<RecordingApi>, minimum_level: Option<Level>) -> ElmahIoSink {
    let mut options = SinkOptions::new("key", Uuid::nil());
    options.period = std::time::Duration::from_secs(3600);
    options.minimum_level = minimum_level;
    ElmahIoSink::with_client(options, api).unwrap()
}

#[tokio::test]
async fn span_and_event_fields_become_properties() {
    let api = RecordingApi::new();
    let sink = sink(api.clone(), None);
    let subscriber = Registry::default().with(ElmahIoLayer::new(sink.clone()));

    tracing::subscriber::with_default(subscriber, || {
        let span = tracing::info_span!("request", user = "alice", url = "/orders");
        let _guard = span.enter();
        tracing::error!(statusCode = 502, user = "bob", "checkout failed");
    });
    sink.flush().await;

    let messages = api.messages();
    assert_eq!(messages.len(), 1);
    let msg = &messages[0];
    assert_eq!(msg.title, "checkout failed");
    assert_eq!(msg.severity, Severity::Error);
    assert_eq!(msg.user.as_deref(), Some("bob"));
    assert_eq!(msg.url.as_deref(), Some("/orders"));
    assert_eq!(msg.status_code, Some(502));
    assert_eq!(msg.category.as_deref(), Some("layer"));
    assert_eq!(msg.data_value("SourceContext"), Some("layer"));
}

#[tokio::test]
async fn error_fields_become_the_exception_chain() {
    let api = RecordingApi::new();
    let sink = sink(api.clone(), None);
    let subscriber = Registry::default().with(ElmahIoLayer::new(sink.clone()));

    let err = PaymentFailed { cause: ConnectionReset };
    tracing::subscriber::with_default(subscriber, || {
        tracing::error!(error = &err as &dyn std::error::Error, "charge rejected");
    });
    sink.flush().await;

    let msg = &api.messages()[0];
    assert_eq!(msg.type_name.as_deref(), Some("ConnectionReset"));
    let detail = msg.detail.as_deref().unwrap();
    assert!(detail.starts_with("PaymentFailed: payment failed ---> ConnectionReset: connection reset"));
}

#[tokio::test]
async fn respects_minimum_level_and_skips_own_diagnostics() {
    let api = RecordingApi::new();
    let sink = sink(api.clone(), Some(Level::Warning));
    let subscriber = Registry::default().with(ElmahIoLayer::new(sink.clone()));

    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!("noise");
        tracing::info!("still noise");
        tracing::warn!("disk almost full");
        tracing::error!(target: SELF_LOG_TARGET, "failed to send batch");
    });
    sink.flush().await;

    let titles: Vec<_> = api.messages().into_iter().map(|m| m.title).collect();
    assert_eq!(titles, vec!["disk almost full"]);
}
