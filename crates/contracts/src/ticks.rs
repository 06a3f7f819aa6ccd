//! Wall-clock ticks
//!
//! Ticks are 100 ns intervals since 0001-01-01T00:00:00 UTC, the timestamp unit
//! understood by the monitoring collector.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Ticks per millisecond
pub const TICKS_PER_MILLISECOND: i64 = 10_000;

/// Ticks per second
pub const TICKS_PER_SECOND: i64 = 1_000 * TICKS_PER_MILLISECOND;

/// Ticks at 1970-01-01T00:00:00 UTC
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Clock signature used by buffers, so tests can substitute a deterministic one.
pub type Clock = fn() -> i64;

/// Current wall-clock ticks.
pub fn now() -> i64 {
    from_system_time(SystemTime::now())
}

/// Convert a `SystemTime` into ticks.
///
/// Times before the Unix epoch are clamped to the epoch.
pub fn from_system_time(time: SystemTime) -> i64 {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    UNIX_EPOCH_TICKS + (since_epoch.as_nanos() / 100) as i64
}

/// Convert ticks back into milliseconds since the Unix epoch.
pub fn to_unix_millis(ticks: i64) -> i64 {
    (ticks - UNIX_EPOCH_TICKS) / TICKS_PER_MILLISECOND
}

/// Convert a duration into whole ticks.
pub fn from_duration(duration: Duration) -> i64 {
    (duration.as_nanos() / 100) as i64
}
