//! Bounded write retry for producers.

use crossbeam::utils::Backoff;
use tracing::warn;

use crate::RingBuffer;

/// Write attempts before a data point is dropped
pub const MAX_WRITE_ATTEMPTS: usize = 15;

/// Write `value` into `buffer`, backing off (spin, then yield) while it is full.
///
/// Gives up after [`MAX_WRITE_ATTEMPTS`]; the data point is then dropped,
/// counted and logged. Never blocks the caller indefinitely.
pub fn write_with_retry(buffer: &RingBuffer, metric_type: &str, value: i64, tag: i32) -> bool {
    let backoff = Backoff::new();

    for _ in 0..MAX_WRITE_ATTEMPTS {
        if buffer.try_write(value, tag) {
            return true;
        }
        backoff.snooze();
    }

    warn!(
        metric_type,
        attempts = MAX_WRITE_ATTEMPTS,
        "Failed to buffer metric data point, value dropped"
    );
    observability::record_buffer_dropped(metric_type);
    false
}
