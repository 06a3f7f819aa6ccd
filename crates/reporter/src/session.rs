//! ReportingSession - one reporter per metric buffer, started and stopped together

use contracts::{HostInformation, PayloadSender, ReportingConfig};
use probes::MetricBuffer;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use crate::error::ReporterError;
use crate::metrics::MetricsSnapshot;
use crate::reporter::{RawDataReporter, ReporterConfig};
use crate::senders::{create_sender, AnySender};

/// Group of reporters sharing a lifecycle
pub struct ReportingSession<S> {
    reporters: Vec<RawDataReporter<S>>,
}

impl<S> Default for ReportingSession<S> {
    fn default() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }
}

impl ReportingSession<AnySender> {
    /// Build one reporter per buffer with the sender chosen by `config`
    #[instrument(
        name = "reporting_session_from_config",
        skip(config, host, buffers),
        fields(endpoint = %config.endpoint_name, buffers = buffers.len())
    )]
    pub async fn from_config(
        config: &ReportingConfig,
        host: &HostInformation,
        buffers: &[MetricBuffer],
    ) -> Result<Self, ReporterError> {
        let reporter_config =
            ReporterConfig::from_settings(&config.reporter, config.reporting_interval());

        let mut session = Self::new();
        for buffer in buffers {
            let sender = create_sender(config, host, buffer.metric_type()).await?;
            session.add(RawDataReporter::for_buffer(
                buffer,
                sender,
                reporter_config.clone(),
            ));
        }
        Ok(session)
    }
}

impl<S> ReportingSession<S> {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reporter; it is started by [`start`](ReportingSession::start)
    pub fn add(&mut self, reporter: RawDataReporter<S>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    pub fn reporters(&self) -> &[RawDataReporter<S>] {
        &self.reporters
    }

    /// Metric type and metrics snapshot of every reporter
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.reporters
            .iter()
            .map(|r| (r.metric_type().to_string(), r.metrics().snapshot()))
            .collect()
    }
}

impl<S: PayloadSender + Sync + 'static> ReportingSession<S> {
    /// Start every reporter
    ///
    /// # Errors
    /// Fails on the first reporter that cannot start; those already started keep running.
    pub fn start(&mut self) -> Result<(), ReporterError> {
        for reporter in &mut self.reporters {
            reporter.start()?;
        }
        info!(reporters = self.reporters.len(), "Reporting session started");
        Ok(())
    }

    /// Stop all reporters concurrently, draining their buffers, then dispose them
    #[instrument(name = "reporting_session_stop", skip(self), fields(reporters = self.reporters.len()))]
    pub async fn stop(&mut self) {
        let mut stopping = JoinSet::new();
        for mut reporter in self.reporters.drain(..) {
            stopping.spawn(async move {
                reporter.stop().await;
                reporter
            });
        }

        let mut stopped = Vec::with_capacity(stopping.len());
        while let Some(result) = stopping.join_next().await {
            match result {
                Ok(mut reporter) => {
                    reporter.dispose();
                    stopped.push(reporter);
                }
                Err(e) => error!(error = ?e, "Reporter stop task failed"),
            }
        }

        // Keep metrics readable after stop
        stopped.sort_by(|a, b| a.metric_type().cmp(b.metric_type()));
        self.reporters = stopped;
        info!("Reporting session stopped");
    }
}

impl<S> std::fmt::Debug for ReportingSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.reporters.iter().map(|r| r.metric_type()).collect();
        f.debug_struct("ReportingSession")
            .field("reporters", &names)
            .finish()
    }
}
