use crate::error::InitError;
use crate::layer::ElmahIoLayer;
use crate::sink::ElmahIoSink;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global subscriber installed by
/// [`init_tracing_with_config`].
///
/// **Fields**
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   added next to [`ElmahIoLayer`] so events are also printed to the
///   console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self { enable_stdout: true }
    }
}

/// Install a global `tracing` subscriber that forwards events to `sink`.
///
/// **Parameters**
/// - `sink`: the [`ElmahIoSink`] that batches and delivers events.
/// - `config`: [`LayerConfig`] controlling extra console output.
///
/// **Returns**
/// - `Err(InitError)` if a global subscriber is already installed.
///
/// Keep a clone of `sink` to call [`ElmahIoSink::shutdown`] before the
/// process exits.
pub fn init_tracing_with_config(sink: ElmahIoSink, config: LayerConfig) -> Result<(), InitError> {
    let layer = ElmahIoLayer::new(sink);

    // Two subscriber shapes because the fmt layer changes the type.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Initialize tracing with [`LayerConfig::default`].
pub fn init_tracing(sink: ElmahIoSink) -> Result<(), InitError> {
    init_tracing_with_config(sink, LayerConfig::default())
}
