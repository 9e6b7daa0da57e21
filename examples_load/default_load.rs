use std::sync::Arc;
use std::time::Instant;
use tracing::error;
use uuid::Uuid;

use elmahio_log_sink::init::{init_tracing_with_config, LayerConfig};
use elmahio_log_sink::noop::NoopApi;
use elmahio_log_sink::{ElmahIoSink, SinkOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = SinkOptions::new("load-test", Uuid::nil());
    let sink = ElmahIoSink::with_client(options, Arc::new(NoopApi))?;
    init_tracing_with_config(sink.clone(), LayerConfig { enable_stdout: false })?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: emitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sink.shutdown().await;
    println!("{:?}", sink.stats());
    Ok(())
}
