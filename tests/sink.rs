mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{wait_until, RecordingApi};
use elmahio_log_sink::client::ElmahIoApi;
use elmahio_log_sink::error::{ConfigError, DeliveryError};
use elmahio_log_sink::host::machine_name;
use elmahio_log_sink::{
    ElmahIoSink, ExceptionInfo, Item, Level, LogEvent, OutboundMessage, PropertyValue, Severity, SinkOptions,
};
use uuid::Uuid;

fn options() -> SinkOptions {
    let mut options = SinkOptions::new("key", Uuid::nil());
    options.period = Duration::from_secs(3600);
    options
}

#[tokio::test]
async fn emits_exception_details() {
    let api = RecordingApi::new();
    let sink = ElmahIoSink::with_client(options(), api.clone()).unwrap();

    let exception = ExceptionInfo::new("System.Exception", "error")
        .with_inner(ExceptionInfo::new("System.DivideByZeroException", "Attempted to divide by zero."));
    sink.emit(
        LogEvent::new(Level::Error, "Simple test")
            .with_property("name", "value")
            .with_exception(exception.clone()),
    );
    sink.flush().await;

    let messages = api.messages();
    assert_eq!(messages.len(), 1);
    let msg = &messages[0];
    assert_eq!(msg.severity, Severity::Error);
    assert_eq!(msg.detail.as_deref(), Some(exception.to_string().as_str()));
    assert_eq!(msg.type_name.as_deref(), Some("System.DivideByZeroException"));
    assert_eq!(msg.hostname, machine_name());
    assert_eq!(msg.data, vec![Item::new("name", Some("value".into()))]);
}

#[tokio::test]
async fn emits_custom_fields() {
    let api = RecordingApi::new();
    let sink = ElmahIoSink::with_client(options(), api.clone()).unwrap();

    sink.emit(
        LogEvent::new(Level::Error, "{type} {hostname} {statusCode}")
            .with_property("type", "type")
            .with_property("hostname", "hostname")
            .with_property("application", "application")
            .with_property("user", "user")
            .with_property("source", "source")
            .with_property("method", "method")
            .with_property("version", "version")
            .with_property("url", "url")
            .with_property("statusCode", 400)
            .with_property("correlationId", "corr")
            .with_property("category", "cat")
            .with_property("Cookies", PropertyValue::dictionary([("session", "s1")])),
    );
    sink.flush().await;

    let msg = &api.messages()[0];
    assert_eq!(msg.type_name.as_deref(), Some("type"));
    assert_eq!(msg.hostname.as_deref(), Some("hostname"));
    assert_eq!(msg.application.as_deref(), Some("application"));
    assert_eq!(msg.user.as_deref(), Some("user"));
    assert_eq!(msg.source.as_deref(), Some("source"));
    assert_eq!(msg.method.as_deref(), Some("method"));
    assert_eq!(msg.version.as_deref(), Some("version"));
    assert_eq!(msg.url.as_deref(), Some("url"));
    assert_eq!(msg.status_code, Some(400));
    assert_eq!(msg.correlation_id.as_deref(), Some("corr"));
    assert_eq!(msg.category.as_deref(), Some("cat"));
    assert_eq!(msg.cookies, vec![Item::new("session", Some("s1".into()))]);
    assert_eq!(msg.title, "\"type\" \"hostname\" 400");
    assert_eq!(msg.title_template.as_deref(), Some("{type} {hostname} {statusCode}"));
}

#[tokio::test]
async fn full_batch_is_sent_without_waiting_for_the_timer() {
    let api = RecordingApi::new();
    let mut opts = options();
    opts.batch_size_limit = 3;
    let sink = ElmahIoSink::with_client(opts, api.clone()).unwrap();

    for n in 0..3 {
        sink.emit(LogEvent::new(Level::Information, "event {N}").with_property("N", n));
    }

    assert!(wait_until(|| !api.batches().is_empty(), Duration::from_secs(2)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let batches = api.batches();
    assert_eq!(batches.len(), 1);
    let titles: Vec<_> = batches[0].iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["event 0", "event 1", "event 2"]);
}

#[tokio::test]
async fn partial_batch_waits_for_the_timer() {
    let api = RecordingApi::new();
    let mut opts = options();
    opts.batch_size_limit = 10;
    opts.period = Duration::from_millis(50);
    let sink = ElmahIoSink::with_client(opts, api.clone()).unwrap();

    sink.emit(LogEvent::new(Level::Information, "lonely"));
    assert_eq!(sink.pending(), 1);

    assert!(wait_until(|| api.messages().len() == 1, Duration::from_secs(2)).await);
    assert_eq!(sink.pending(), 0);
}

#[tokio::test]
async fn empty_periods_never_call_the_api() {
    let api = RecordingApi::new();
    let mut opts = options();
    opts.period = Duration::from_millis(20);
    let sink = ElmahIoSink::with_client(opts, api.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    sink.flush().await;

    assert!(api.batches().is_empty());
    assert_eq!(sink.stats().submitted_batches, 0);
}

#[tokio::test]
async fn filtered_messages_are_never_sent_or_observed() {
    let api = RecordingApi::new();
    let observed = Arc::new(AtomicUsize::new(0));
    let observed_hook = Arc::clone(&observed);
    let opts = options()
        .on_filter(|_| true)
        .on_message(move |_| {
            observed_hook.fetch_add(1, Ordering::SeqCst);
        });
    let sink = ElmahIoSink::with_client(opts, api.clone()).unwrap();

    sink.emit(LogEvent::new(Level::Error, "dropped"));
    sink.flush().await;

    assert!(api.batches().is_empty());
    assert_eq!(observed.load(Ordering::SeqCst), 0);
    assert_eq!(sink.stats().filtered, 1);
}

#[tokio::test]
async fn on_message_can_decorate_before_sending() {
    let api = RecordingApi::new();
    let opts = options().on_message(|msg| msg.version = Some("9.9.9".into()));
    let sink = ElmahIoSink::with_client(opts, api.clone()).unwrap();

    sink.emit(LogEvent::new(Level::Warning, "decorated"));
    sink.flush().await;

    assert_eq!(api.messages()[0].version.as_deref(), Some("9.9.9"));
}

#[tokio::test]
async fn delivery_failures_reach_on_error_and_nothing_else() {
    let api = RecordingApi::failing();
    let failed = Arc::new(Mutex::new(Vec::new()));
    let failed_hook = Arc::clone(&failed);
    let opts = options().on_error(move |msg, err| {
        failed_hook.lock().unwrap().push((msg.title.clone(), err.to_string()));
    });
    let sink = ElmahIoSink::with_client(opts, api.clone()).unwrap();

    sink.emit(LogEvent::new(Level::Error, "first"));
    sink.emit(LogEvent::new(Level::Error, "second"));
    sink.flush().await;

    let failed = failed.lock().unwrap().clone();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].0, "first");
    assert!(failed[0].1.contains("500"));
    assert_eq!(sink.stats().failed_batches, 1);

    // the next flush is independent of the failed one
    sink.emit(LogEvent::new(Level::Error, "third"));
    sink.flush().await;
    assert_eq!(sink.stats().failed_batches, 2);
}

#[tokio::test]
async fn events_below_minimum_level_are_ignored() {
    let api = RecordingApi::new();
    let mut opts = options();
    opts.minimum_level = Some(Level::Warning);
    let sink = ElmahIoSink::with_client(opts, api.clone()).unwrap();

    sink.emit(LogEvent::new(Level::Information, "quiet"));
    sink.emit(LogEvent::new(Level::Fatal, "loud"));
    sink.flush().await;

    let titles: Vec<_> = api.messages().into_iter().map(|m| m.title).collect();
    assert_eq!(titles, vec!["loud"]);
}

#[tokio::test]
async fn shutdown_flushes_remaining_events() {
    let api = RecordingApi::new();
    let sink = ElmahIoSink::with_client(options(), api.clone()).unwrap();

    sink.emit(LogEvent::new(Level::Information, "last words"));
    sink.shutdown().await;
    assert_eq!(api.messages().len(), 1);

    sink.emit(LogEvent::new(Level::Information, "too late"));
    sink.shutdown().await;
    assert_eq!(api.messages().len(), 1);
    assert_eq!(sink.stats().dropped, 1);
}

#[tokio::test]
async fn registers_installation_once() {
    let api = RecordingApi::failing();
    let sink = ElmahIoSink::with_client(options(), api.clone()).unwrap();

    assert!(wait_until(|| api.installations.load(Ordering::SeqCst) == 1, Duration::from_secs(2)).await);
    sink.emit(LogEvent::new(Level::Information, "still works"));
    sink.flush().await;
    assert_eq!(api.installations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_configuration_fails_fast() {
    let mut opts = options();
    opts.batch_size_limit = 0;
    assert!(matches!(
        ElmahIoSink::with_client(opts, RecordingApi::new()),
        Err(ConfigError::ZeroBatchSize)
    ));

    let opts = SinkOptions::new("", Uuid::nil());
    assert!(matches!(ElmahIoSink::new(opts), Err(ConfigError::EmptyApiKey)));
}

#[tokio::test]
async fn panicking_filter_does_not_stop_delivery() {
    let api = RecordingApi::new();
    let mut opts = options();
    opts.period = Duration::from_millis(50);
    let panicked = Arc::new(AtomicBool::new(false));
    let panicked_hook = Arc::clone(&panicked);
    let opts = opts.on_filter(move |_| {
        if !panicked_hook.swap(true, Ordering::SeqCst) {
            panic!("filter bug");
        }
        false
    });
    let sink = ElmahIoSink::with_client(opts, api.clone()).unwrap();

    sink.emit(LogEvent::new(Level::Error, "first"));
    assert!(wait_until(|| panicked.load(Ordering::SeqCst), Duration::from_secs(2)).await);
    sink.emit(LogEvent::new(Level::Error, "second"));

    assert!(wait_until(|| api.messages().len() == 1, Duration::from_secs(2)).await);
    assert_eq!(api.messages()[0].title, "second");
    assert_eq!(sink.stats().failed_batches, 1);
    assert_eq!(sink.pending(), 0);
}

/// Never answers the first bulk request; records the rest.
#[derive(Default)]
struct StallingApi {
    stalled: AtomicBool,
    delivered: Mutex<Vec<String>>,
}

#[async_trait]
impl ElmahIoApi for StallingApi {
    async fn create_bulk_and_notify(
        &self,
        _log_id: Uuid,
        messages: &[OutboundMessage],
    ) -> Result<(), DeliveryError> {
        if !self.stalled.swap(true, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let mut delivered = self.delivered.lock().unwrap();
        delivered.extend(messages.iter().map(|m| m.title.clone()));
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_submission_times_out_and_delivery_continues() {
    let api = Arc::new(StallingApi::default());
    let failures = Arc::new(Mutex::new(Vec::new()));
    let failures_hook = Arc::clone(&failures);
    let opts = options().on_error(move |msg, err| {
        let timed_out = matches!(err, DeliveryError::Timeout(limit) if *limit == Duration::from_secs(30));
        failures_hook.lock().unwrap().push((msg.title.clone(), timed_out));
    });
    let sink = ElmahIoSink::with_client(opts, api.clone()).unwrap();

    sink.emit(LogEvent::new(Level::Error, "stuck"));
    sink.flush().await;

    assert_eq!(*failures.lock().unwrap(), vec![("stuck".to_string(), true)]);
    assert_eq!(sink.stats().failed_batches, 1);

    sink.emit(LogEvent::new(Level::Error, "unstuck"));
    sink.flush().await;

    assert_eq!(*api.delivered.lock().unwrap(), vec!["unstuck".to_string()]);
    assert_eq!(sink.stats().submitted_batches, 1);
}
