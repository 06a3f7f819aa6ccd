//! Reporter metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single reporter
#[derive(Debug, Default)]
pub struct ReporterMetrics {
    /// Payloads currently being sent
    in_flight: AtomicUsize,
    /// Highest observed `in_flight`
    max_in_flight: AtomicUsize,
    /// Total payloads sent successfully
    payloads_sent: AtomicU64,
    /// Total entries in successfully sent payloads
    entries_sent: AtomicU64,
    /// Total bytes in successfully sent payloads
    bytes_sent: AtomicU64,
    /// Total entries drained from the buffer
    entries_flushed: AtomicU64,
    /// Total send failures
    failure_count: AtomicU64,
    /// Sends aborted by shutdown
    cancelled_count: AtomicU64,
}

impl ReporterMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current in-flight sends
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Mark a send as started
    pub fn send_started(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_in_flight.fetch_max(now, Ordering::Relaxed);
    }

    /// Mark a send as finished (whatever the outcome)
    pub fn send_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get the highest number of concurrent sends observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::Relaxed)
    }

    /// Get total payloads sent
    pub fn payloads_sent(&self) -> u64 {
        self.payloads_sent.load(Ordering::Relaxed)
    }

    /// Record a successful send
    pub fn inc_payloads_sent(&self, entries: usize, bytes: usize) {
        self.payloads_sent.fetch_add(1, Ordering::Relaxed);
        self.entries_sent.fetch_add(entries as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Get total entries sent
    pub fn entries_sent(&self) -> u64 {
        self.entries_sent.load(Ordering::Relaxed)
    }

    /// Get total bytes sent
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Get total entries drained
    pub fn entries_flushed(&self) -> u64 {
        self.entries_flushed.load(Ordering::Relaxed)
    }

    /// Record drained entries
    pub fn add_entries_flushed(&self, entries: usize) {
        self.entries_flushed.fetch_add(entries as u64, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get cancelled count
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled_count.load(Ordering::Relaxed)
    }

    /// Increment cancelled count
    pub fn inc_cancelled_count(&self) {
        self.cancelled_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            in_flight: self.in_flight(),
            max_in_flight: self.max_in_flight(),
            payloads_sent: self.payloads_sent(),
            entries_sent: self.entries_sent(),
            bytes_sent: self.bytes_sent(),
            entries_flushed: self.entries_flushed(),
            failure_count: self.failure_count(),
            cancelled_count: self.cancelled_count(),
        }
    }
}

/// Snapshot of reporter metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub in_flight: usize,
    pub max_in_flight: usize,
    pub payloads_sent: u64,
    pub entries_sent: u64,
    pub bytes_sent: u64,
    pub entries_flushed: u64,
    pub failure_count: u64,
    pub cancelled_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_tracks_maximum() {
        let metrics = ReporterMetrics::new();
        metrics.send_started();
        metrics.send_started();
        metrics.send_finished();
        metrics.send_started();
        metrics.send_finished();
        metrics.send_finished();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.max_in_flight, 2);
    }

    #[test]
    fn test_snapshot_counts() {
        let metrics = ReporterMetrics::new();
        metrics.add_entries_flushed(10);
        metrics.inc_payloads_sent(10, 180);
        metrics.inc_failure_count();
        metrics.inc_cancelled_count();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.entries_flushed, 10);
        assert_eq!(snapshot.payloads_sent, 1);
        assert_eq!(snapshot.entries_sent, 10);
        assert_eq!(snapshot.bytes_sent, 180);
        assert_eq!(snapshot.failure_count, 1);
        assert_eq!(snapshot.cancelled_count, 1);
    }
}
