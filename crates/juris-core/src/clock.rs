#![forbid(unsafe_code)]

//! Wall-clock helpers that also work on wasm hosts.

use web_time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch; `0` if the clock is before it.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
