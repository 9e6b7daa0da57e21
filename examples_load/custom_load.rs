use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::error;
use uuid::Uuid;

use elmahio_log_sink::init::{init_tracing_with_config, LayerConfig};
use elmahio_log_sink::noop::NoopApi;
use elmahio_log_sink::{ElmahIoSink, SinkOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut options = SinkOptions::new("load-test", Uuid::nil());
    options.batch_size_limit = 1_000;
    options.period = Duration::from_millis(200);
    options.queue_limit = 50_000;
    let options = options.on_filter(|msg| msg.title.contains("ignored"));

    let sink = ElmahIoSink::with_client(options, Arc::new(NoopApi))?;
    init_tracing_with_config(sink.clone(), LayerConfig { enable_stdout: false })?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        if i % 10 == 0 {
            error!(iteration = i, "ignored load test error");
        } else {
            error!(iteration = i, "custom load test error");
        }
    }

    let elapsed = start.elapsed();
    println!("custom config: emitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sink.shutdown().await;
    println!("{:?}", sink.stats());
    Ok(())
}
