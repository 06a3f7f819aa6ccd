//! Run statistics.

use std::time::Duration;

use observability::ReportSummary;
use reporter::MetricsSnapshot;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Number of producers that were active
    pub producers: usize,

    /// Probe events emitted by all producers
    pub events_emitted: u64,

    /// Per-metric value statistics
    pub summary: ReportSummary,

    /// Reporter metrics per metric type
    pub reporters: Vec<(String, MetricsSnapshot)>,
}

impl RunStats {
    /// Events per second throughput
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events_emitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Entries acknowledged by senders across all reporters
    pub fn entries_sent(&self) -> u64 {
        self.reporters.iter().map(|(_, m)| m.entries_sent).sum()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Producers: {}", self.producers);
        println!("   ├─ Events emitted: {}", self.events_emitted);
        println!("   ├─ Events/s: {:.2}", self.events_per_sec());
        println!("   └─ Entries sent: {}", self.entries_sent());

        println!("\nReporters");
        for (metric_type, m) in &self.reporters {
            println!(
                "   ├─ {}: payloads={} entries={} bytes={} failures={} cancelled={} max_in_flight={}",
                metric_type,
                m.payloads_sent,
                m.entries_sent,
                m.bytes_sent,
                m.failure_count,
                m.cancelled_count,
                m.max_in_flight
            );
        }

        println!("\n{}", self.summary);
    }
}
