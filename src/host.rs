//! Machine name detection for the message `hostname` fallback.

use std::env;
use tracing::debug;

use crate::SELF_LOG_TARGET;

/// Name of the local machine, or `None` when it cannot be determined.
///
/// Tries the system hostname first and then the `COMPUTERNAME`
/// environment variable. Empty values count as missing.
pub fn machine_name() -> Option<String> {
    system_hostname().or_else(|| non_empty_env("COMPUTERNAME"))
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name.into_string().ok().filter(|s| !s.trim().is_empty()),
        Err(e) => {
            debug!(target: SELF_LOG_TARGET, "failed to read system hostname: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    debug!(target: SELF_LOG_TARGET, "no system hostname lookup on this platform");
    None
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
