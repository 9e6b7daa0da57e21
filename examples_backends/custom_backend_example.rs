use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use elmahio_log_sink::client::ElmahIoApi;
use elmahio_log_sink::error::DeliveryError;
use elmahio_log_sink::init::init_tracing;
use elmahio_log_sink::{ElmahIoSink, OutboundMessage, SinkOptions};

/// Example of plugging in a different transport by implementing
/// `ElmahIoApi` directly, e.g. a proxy or an in-house collector.
struct StdoutApi;

#[async_trait]
impl ElmahIoApi for StdoutApi {
    async fn create_bulk_and_notify(
        &self,
        log_id: Uuid,
        messages: &[OutboundMessage],
    ) -> Result<(), DeliveryError> {
        let json = serde_json::to_string_pretty(messages)?;
        println!("[{}] {}", log_id, json);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut options = SinkOptions::new("unused", Uuid::nil());
    options.application = Some("custom-backend-example".to_string());

    let sink = ElmahIoSink::with_client(options, Arc::new(StdoutApi))?;
    init_tracing(sink.clone())?;

    info!("custom backend example started");
    error!(db = "my-custom-db", "simulated error sent via custom backend");

    sink.shutdown().await;
    Ok(())
}
