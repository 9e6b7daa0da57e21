pub mod event;
pub mod template;
pub mod exception;
pub mod message;
pub mod flatten;
pub mod extract;
pub mod host;
pub mod builder;
pub mod hooks;
pub mod options;
pub mod env;
pub mod error;
pub mod client;
pub mod http;
pub mod noop;
pub mod installation;
pub mod batch;
pub mod sink;
pub mod layer;
pub mod init;

pub use event::{Level, LogEvent, PropertyValue, Scalar};
pub use exception::ExceptionInfo;
pub use message::{Item, OutboundMessage, Severity};
pub use options::{LevelSwitch, SinkOptions};
pub use sink::ElmahIoSink;

/// `tracing` target used for the sink's own diagnostics. The layer never
/// forwards events from this target.
pub const SELF_LOG_TARGET: &str = "elmahio_log_sink::self_log";
