//! Startup check that the search backend is reachable

use crate::config::ConnectionConfig;
use catalog_core::{Error, Result};
use catalog_search::SearchBackend;
use std::time::Duration;
use tracing::{info, warn};

/// Ping the backend until it answers, backing off between failures
///
/// With the default settings the sequence is: ping, wait 5 s, ping, wait
/// 10 s, ping, wait 20 s, give up. `sleep` performs the waits so callers and
/// tests control the clock. Returns the number of pings made.
///
/// # Errors
///
/// `Error::BackendUnavailable` after `max_attempts` failed pings.
pub fn wait_until_available<F>(
    backend: &dyn SearchBackend,
    config: &ConnectionConfig,
    mut sleep: F,
) -> Result<u32>
where
    F: FnMut(Duration),
{
    for failures in 0..config.max_attempts {
        if backend.ping() {
            info!(target: "catalog::backend", attempts = failures + 1, "Backend is available");
            return Ok(failures + 1);
        }
        let delay = config.delay_after(failures);
        warn!(
            target: "catalog::backend",
            attempt = failures + 1,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Backend not reachable, retrying"
        );
        sleep(delay);
    }
    Err(Error::unavailable(
        "ping",
        format!("no answer after {} attempts", config.max_attempts),
    ))
}

/// [`wait_until_available`] with real thread sleeps
pub fn wait_until_available_blocking(
    backend: &dyn SearchBackend,
    config: &ConnectionConfig,
) -> Result<u32> {
    wait_until_available(backend, config, std::thread::sleep)
}
