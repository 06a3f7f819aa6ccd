//! Pipeline orchestrator - wires probes, buffers and reporters together.
//!
//! Synthetic producers emit probe events at a fixed rate until the run
//! duration elapses or shutdown is requested; then every buffer is drained.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{HostInformation, ReportingConfig};
use observability::ReportStatsAggregator;
use parking_lot::Mutex;
use probes::{metric_type_name, ProbeEvent, ProbeRegistry};
use reporter::ReportingSession;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::RunStats;

const MESSAGE_TYPES: [&str; 3] = [
    "Sales.OrderPlaced",
    "Sales.OrderBilled",
    "Shipping.OrderShipped",
];

const QUEUES: [&str; 2] = ["Sales.Input", "Shipping.Input"];

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Reporting configuration loaded from file
    pub reporting: ReportingConfig,

    /// Run duration (None = until shutdown)
    pub duration: Option<Duration>,

    /// Number of concurrent producers
    pub producers: usize,

    /// Events per second per producer
    pub rate: u64,

    /// Ring buffer capacity per metric type
    pub buffer_capacity: usize,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the configured duration elapses or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        let start_time = Instant::now();
        let host = HostInformation::local();

        info!(
            endpoint = %self.config.reporting.endpoint_name,
            host_id = %host.host_id_string(),
            machine = %host.machine_name,
            "Setting up probes and buffers..."
        );

        let registry = Arc::new(ProbeRegistry::new());
        let aggregator = Arc::new(Mutex::new(ReportStatsAggregator::new()));
        {
            let aggregator = Arc::clone(&aggregator);
            registry.register(move |event| {
                let (metric_type, value) = event_value(event);
                aggregator.lock().record(&metric_type, value);
            });
        }
        let buffers = registry.attach_buffers_with_capacity(self.config.buffer_capacity);

        let mut session =
            ReportingSession::from_config(&self.config.reporting, &host, &buffers)
                .await
                .context("Failed to create reporters")?;
        session.start().context("Failed to start reporters")?;

        info!(
            reporters = session.len(),
            sender = self.config.reporting.sender.kind(),
            "Reporters started"
        );

        // Start producers
        let cancel = CancellationToken::new();
        let mut producers = JoinSet::new();
        let period = producer_period(self.config.rate);
        for id in 0..self.config.producers {
            producers.spawn(produce(
                id,
                Arc::clone(&registry),
                period,
                cancel.clone(),
            ));
        }

        info!(
            producers = self.config.producers,
            rate = self.config.rate,
            duration = ?self.config.duration,
            "Pipeline running"
        );

        let deadline = async {
            match self.config.duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = deadline => info!("Run duration elapsed"),
            _ = shutdown => warn!("Received shutdown signal, stopping pipeline..."),
        }

        // Shutdown: producers first, then drain every buffer
        cancel.cancel();
        let mut events_emitted = 0u64;
        while let Some(result) = producers.join_next().await {
            match result {
                Ok(emitted) => events_emitted += emitted,
                Err(e) => warn!(error = %e, "Producer task failed"),
            }
        }

        info!(events_emitted, "Producers stopped, draining buffers...");
        session.stop().await;

        let reporters = session.metrics();
        let flushed: u64 = reporters.iter().map(|(_, m)| m.entries_flushed).sum();

        let mut aggregator = aggregator.lock().clone();
        aggregator.record_dropped(events_emitted.saturating_sub(flushed));

        let stats = RunStats {
            duration: start_time.elapsed(),
            producers: self.config.producers,
            events_emitted,
            summary: aggregator.summary(),
            reporters,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            events_per_sec = format!("{:.2}", stats.events_per_sec()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Metric type and numeric value of a probe event, as buffered
fn event_value(event: &ProbeEvent) -> (String, f64) {
    let value = match event {
        ProbeEvent::Duration { event, .. } => event.duration.as_millis() as f64,
        ProbeEvent::Signal { .. } => 1.0,
        ProbeEvent::QueueLength { event, .. } => event.length as f64,
    };
    (metric_type_name(event.probe()), value)
}

fn producer_period(rate: u64) -> Duration {
    let rate = u32::try_from(rate.max(1)).unwrap_or(u32::MAX);
    (Duration::from_secs(1) / rate).max(Duration::from_micros(1))
}

/// Emit one event per tick until cancelled; returns the number emitted
async fn produce(
    id: usize,
    registry: Arc<ProbeRegistry>,
    period: Duration,
    cancel: CancellationToken,
) -> u64 {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut seq = 0u64;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                emit(&registry, id, seq);
                seq += 1;
            }
        }
    }

    debug!(producer = id, emitted = seq, "Producer stopped");
    seq
}

fn emit(registry: &ProbeRegistry, producer: usize, seq: u64) {
    let message_type = MESSAGE_TYPES[(seq as usize + producer) % MESSAGE_TYPES.len()];
    match seq % 4 {
        0 => registry
            .processing_time
            .record(Duration::from_millis(5 + seq % 45), message_type),
        1 => registry
            .critical_time
            .record(Duration::from_millis(20 + seq % 180), message_type),
        2 => registry.retries.signal(message_type),
        _ => registry
            .queue_length
            .signal(QUEUES[producer % QUEUES.len()], (seq % 100) as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SenderConfig;

    #[test]
    fn test_producer_period() {
        assert_eq!(producer_period(1000), Duration::from_millis(1));
        assert_eq!(producer_period(0), Duration::from_secs(1));
        assert_eq!(producer_period(u64::MAX), Duration::from_micros(1));
    }

    #[test]
    fn test_emit_cycles_through_probes() {
        let registry = ProbeRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.register(move |event| sink.lock().push(event_value(event)));

        for seq in 0..4 {
            emit(&registry, 0, seq);
        }

        let seen = seen.lock();
        let names: Vec<&str> = seen.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec!["ProcessingTime", "CriticalTime", "Retries", "QueueLength"]
        );
        assert_eq!(seen[0].1, 5.0);
        assert_eq!(seen[2].1, 1.0);
        assert_eq!(seen[3].1, 3.0);
    }

    #[tokio::test]
    async fn test_pipeline_reports_everything_emitted() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporting = ReportingConfig::new("Sales", "Particular.Monitoring");
        reporting.sender = SenderConfig::File {
            dir: dir.path().to_path_buf(),
        };

        let pipeline = Pipeline::new(PipelineConfig {
            reporting,
            duration: Some(Duration::from_millis(200)),
            producers: 2,
            rate: 500,
            buffer_capacity: 4096,
        });
        let stats = pipeline.run(std::future::pending()).await.unwrap();

        assert!(stats.events_emitted > 0);
        assert_eq!(stats.summary.total_values, stats.events_emitted);
        assert_eq!(stats.summary.dropped, 0);
        assert_eq!(stats.entries_sent(), stats.events_emitted);
        assert!(std::fs::read_dir(dir.path()).unwrap().count() > 0);
    }
}
