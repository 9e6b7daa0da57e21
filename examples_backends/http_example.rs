use tracing::{error, info, info_span};

use elmahio_log_sink::init::init_tracing;
use elmahio_log_sink::{ElmahIoSink, SinkOptions};

/// Ships events to elmah.io using `ELMAHIO_API_KEY` and `ELMAHIO_LOG_ID`
/// from the environment.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = SinkOptions::from_env()?
        .on_message(|msg| msg.version = Some(env!("CARGO_PKG_VERSION").to_string()))
        .on_error(|msg, err| eprintln!("could not deliver {:?}: {}", msg.title, err));

    let sink = ElmahIoSink::new(options)?;
    init_tracing(sink.clone())?;

    info!("starting service");

    let span = info_span!("request", method = "POST", url = "/login", correlationid = "abc-123");
    let _guard = span.enter();

    let err = "forty-two".parse::<i32>().unwrap_err();
    error!(
        error = &err as &(dyn std::error::Error + 'static),
        user = "alice",
        statuscode = 401,
        "authentication failed"
    );

    sink.shutdown().await;
    Ok(())
}
