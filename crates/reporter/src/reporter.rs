//! RawDataReporter - drains one ring buffer into payloads with a background task

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use contracts::{Entry, PayloadSender, ReporterSettings};
use probes::MetricBuffer;
use ring_buffer::RingBuffer;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use wire::PayloadWriter;

use crate::error::ReporterError;
use crate::metrics::ReporterMetrics;

/// Default bound on concurrently outstanding sends
pub const MAX_PARALLEL_CONSUMERS: usize = contracts::DEFAULT_MAX_PARALLEL_CONSUMERS;

/// Idle iterations that only yield before the wait starts sleeping
const IDLE_YIELDS: u32 = 10;

/// Upper bound of one idle sleep
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(50);

/// Reporter tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Buffered entries that trigger a flush
    pub flush_size: usize,
    /// Maximum entries per payload
    pub max_flush_size: usize,
    /// Longest wait for `flush_size` entries before flushing whatever is buffered
    pub max_spinning_time: Duration,
    /// Maximum payloads in flight
    pub max_parallel_consumers: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            flush_size: contracts::DEFAULT_FLUSH_SIZE,
            max_flush_size: contracts::DEFAULT_MAX_FLUSH_SIZE,
            max_spinning_time: Duration::from_secs(10),
            max_parallel_consumers: MAX_PARALLEL_CONSUMERS,
        }
    }
}

impl ReporterConfig {
    /// Build from configuration file settings and the reporting interval
    pub fn from_settings(settings: &ReporterSettings, reporting_interval: Duration) -> Self {
        Self {
            flush_size: settings.flush_size,
            max_flush_size: settings.max_flush_size,
            max_spinning_time: reporting_interval,
            max_parallel_consumers: settings.max_parallel_consumers,
        }
    }

    /// Clamp counts to at least one
    fn normalized(mut self) -> Self {
        self.flush_size = self.flush_size.max(1);
        self.max_flush_size = self.max_flush_size.max(1);
        self.max_parallel_consumers = self.max_parallel_consumers.max(1);
        self
    }
}

/// Reporter of one metric stream.
///
/// Owns a background loop that waits until `flush_size` entries are buffered
/// (or `max_spinning_time` passed), drains the buffer into payloads of at most
/// `max_flush_size` entries and hands them to the sender, with at most
/// `max_parallel_consumers` sends outstanding.
pub struct RawDataReporter<S> {
    metric_type: Arc<str>,
    sender: Arc<S>,
    buffer: Arc<RingBuffer>,
    writer: Arc<dyn PayloadWriter>,
    config: ReporterConfig,
    metrics: Arc<ReporterMetrics>,
    /// Stops the drain loop
    stop_token: CancellationToken,
    /// Aborts outstanding sends
    send_token: CancellationToken,
    worker: Option<JoinHandle<()>>,
    started: bool,
}

impl<S: PayloadSender + Sync + 'static> RawDataReporter<S> {
    /// Create a reporter; nothing runs until [`start`](Self::start)
    pub fn new(
        metric_type: impl Into<Arc<str>>,
        sender: S,
        buffer: Arc<RingBuffer>,
        writer: Arc<dyn PayloadWriter>,
        config: ReporterConfig,
    ) -> Self {
        Self {
            metric_type: metric_type.into(),
            sender: Arc::new(sender),
            buffer,
            writer,
            config: config.normalized(),
            metrics: Arc::new(ReporterMetrics::new()),
            stop_token: CancellationToken::new(),
            send_token: CancellationToken::new(),
            worker: None,
            started: false,
        }
    }

    /// Create a reporter draining a probe buffer with its tagged writer
    pub fn for_buffer(buffer: &MetricBuffer, sender: S, config: ReporterConfig) -> Self {
        let writer: Arc<dyn PayloadWriter> = buffer.writer().clone();
        Self::new(
            buffer.metric_type(),
            sender,
            Arc::clone(buffer.ring()),
            writer,
            config,
        )
    }

    /// Spawn the drain loop on the current Tokio runtime
    ///
    /// # Errors
    /// Fails when already started or when called outside a runtime.
    pub fn start(&mut self) -> Result<(), ReporterError> {
        if self.started {
            return Err(ReporterError::Start {
                metric_type: self.metric_type.to_string(),
                message: "already started".to_string(),
            });
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| ReporterError::Start {
            metric_type: self.metric_type.to_string(),
            message: e.to_string(),
        })?;

        let worker = DrainWorker {
            metric_type: Arc::clone(&self.metric_type),
            sender: Arc::clone(&self.sender),
            buffer: Arc::clone(&self.buffer),
            writer: Arc::clone(&self.writer),
            metrics: Arc::clone(&self.metrics),
            stop: self.stop_token.clone(),
            send_cancel: self.send_token.clone(),
            permits: Arc::new(Semaphore::new(self.config.max_parallel_consumers)),
            in_flight: JoinSet::new(),
            pending: Vec::with_capacity(self.config.max_flush_size.min(64 * 1024)),
            config: self.config.clone(),
        };

        self.worker = Some(runtime.spawn(worker.run()));
        self.started = true;

        info!(
            metric_type = %self.metric_type,
            sender = %self.sender.name(),
            flush_size = self.config.flush_size,
            max_flush_size = self.config.max_flush_size,
            max_parallel_consumers = self.config.max_parallel_consumers,
            "Reporter started"
        );
        Ok(())
    }

    /// Stop the drain loop.
    ///
    /// Completes once every entry written before the call was handed to the
    /// sender and all outstanding sends finished. Calling it again is a no-op.
    #[instrument(name = "reporter_stop", skip(self), fields(metric_type = %self.metric_type))]
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.stop_token.cancel();

        match worker.await {
            Ok(()) => {
                let snapshot = self.metrics.snapshot();
                info!(
                    metric_type = %self.metric_type,
                    payloads = snapshot.payloads_sent,
                    entries = snapshot.entries_flushed,
                    failures = snapshot.failure_count,
                    "Reporter stopped"
                );
            }
            Err(e) if e.is_cancelled() => {
                debug!(metric_type = %self.metric_type, "Reporter loop was aborted");
            }
            Err(e) => {
                error!(metric_type = %self.metric_type, error = ?e, "Reporter loop panicked");
            }
        }
    }
}

impl<S> RawDataReporter<S> {
    /// Metric type reported by this reporter
    pub fn metric_type(&self) -> &str {
        &self.metric_type
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<ReporterMetrics> {
        &self.metrics
    }

    /// Drained buffer
    pub fn buffer(&self) -> &Arc<RingBuffer> {
        &self.buffer
    }

    /// Whether the drain loop is running
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Release resources: cancels outstanding sends and aborts the loop if still running.
    ///
    /// Call [`stop`](RawDataReporter::stop) first to avoid losing buffered data.
    pub fn dispose(&mut self) {
        self.stop_token.cancel();
        self.send_token.cancel();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl<S> Drop for RawDataReporter<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// State owned by the background loop
struct DrainWorker<S> {
    metric_type: Arc<str>,
    sender: Arc<S>,
    buffer: Arc<RingBuffer>,
    writer: Arc<dyn PayloadWriter>,
    config: ReporterConfig,
    metrics: Arc<ReporterMetrics>,
    stop: CancellationToken,
    send_cancel: CancellationToken,
    permits: Arc<Semaphore>,
    in_flight: JoinSet<()>,
    /// Entries drained but not yet encoded
    pending: Vec<Entry>,
}

impl<S: PayloadSender + Sync + 'static> DrainWorker<S> {
    async fn run(mut self) {
        debug!(metric_type = %self.metric_type, "Reporter loop started");

        let mut last_flush = Instant::now();
        while !self.stop.is_cancelled() {
            self.wait_for_data(last_flush).await;
            if self.stop.is_cancelled() {
                break;
            }

            let target = self.buffer.written();
            self.drain_until(target, false).await;
            last_flush = Instant::now();
        }

        // Everything claimed before the stop signal goes out, stragglers included.
        let target = self.buffer.written();
        self.drain_until(target, true).await;
        self.finish().await;
    }

    /// Wait until `flush_size` entries are buffered, `max_spinning_time` has
    /// passed since `since`, or a stop is requested.
    async fn wait_for_data(&mut self, since: Instant) {
        let flush_size = self.config.flush_size as u64;
        let mut idle: u32 = 0;

        loop {
            self.reap_finished();

            let depth = self.buffer.roughly_estimate_items_to_consume();
            if depth >= flush_size || self.stop.is_cancelled() {
                break;
            }
            let elapsed = since.elapsed();
            if elapsed >= self.config.max_spinning_time {
                break;
            }

            if idle < IDLE_YIELDS {
                tokio::task::yield_now().await;
            } else {
                let shift = (idle - IDLE_YIELDS).min(6);
                let delay = (Duration::from_millis(1) * (1u32 << shift))
                    .min(MAX_IDLE_SLEEP)
                    .min(self.config.max_spinning_time - elapsed);

                tokio::select! {
                    _ = self.stop.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            idle = idle.saturating_add(1);
        }

        observability::record_buffer_depth(
            &self.metric_type,
            self.buffer.roughly_estimate_items_to_consume(),
        );
    }

    /// Drain up to write position `target`, one payload per `max_flush_size` entries.
    ///
    /// With `exhaustive`, waits for slots claimed but not yet published instead
    /// of leaving them for the next cycle.
    async fn drain_until(&mut self, target: u64, exhaustive: bool) {
        while self.buffer.consumed() < target {
            let room = self.config.max_flush_size - self.pending.len();
            let pending = &mut self.pending;
            let drained = self
                .buffer
                .consume(room, |chunk| pending.extend_from_slice(chunk));

            if drained == 0 {
                if !exhaustive {
                    break;
                }
                tokio::task::yield_now().await;
                continue;
            }

            self.metrics.add_entries_flushed(drained);
            if self.pending.len() >= self.config.max_flush_size {
                self.flush().await;
            }
        }

        if !self.pending.is_empty() {
            self.flush().await;
        }
    }

    /// Encode pending entries into one payload and submit it
    async fn flush(&mut self) {
        let entries = self.pending.len();
        let mut out = BytesMut::with_capacity(32 + entries * 16);
        self.writer.write(&mut self.pending, &mut out);
        self.pending.clear();
        let payload = out.freeze();

        self.reap_finished();

        // Waits while max_parallel_consumers sends are outstanding
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            warn!(metric_type = %self.metric_type, entries, "Send permits closed, payload dropped");
            return;
        };

        debug!(
            metric_type = %self.metric_type,
            entries,
            bytes = payload.len(),
            "Flushing payload"
        );

        self.in_flight.spawn(send_payload(
            Arc::clone(&self.sender),
            Arc::clone(&self.metric_type),
            Arc::clone(&self.metrics),
            self.send_cancel.clone(),
            payload,
            entries,
            permit,
        ));
    }

    fn reap_finished(&mut self) {
        while let Some(result) = self.in_flight.try_join_next() {
            self.log_join_result(result);
        }
    }

    async fn finish(mut self) {
        while let Some(result) = self.in_flight.join_next().await {
            self.log_join_result(result);
        }
        debug!(metric_type = %self.metric_type, "Reporter loop finished");
    }

    fn log_join_result(&self, result: Result<(), JoinError>) {
        if let Err(e) = result {
            if !e.is_cancelled() {
                error!(metric_type = %self.metric_type, error = ?e, "Send task panicked");
            }
        }
    }
}

/// Send one payload; failures are logged and counted, never retried
async fn send_payload<S: PayloadSender + Sync>(
    sender: Arc<S>,
    metric_type: Arc<str>,
    metrics: Arc<ReporterMetrics>,
    cancel: CancellationToken,
    payload: Bytes,
    entries: usize,
    _permit: OwnedSemaphorePermit,
) {
    let bytes = payload.len();

    metrics.send_started();
    let result = sender.send(payload, cancel.clone()).await;
    metrics.send_finished();

    match result {
        Ok(()) => {
            metrics.inc_payloads_sent(entries, bytes);
            observability::record_payload_sent(&metric_type, bytes, entries);
        }
        Err(e) if e.is_cancelled() => {
            metrics.inc_cancelled_count();
            debug!(
                metric_type = %metric_type,
                destination = %sender.name(),
                "Payload send cancelled by shutdown"
            );
        }
        Err(e) => {
            metrics.inc_failure_count();
            observability::record_payload_failed(&metric_type);
            error!(
                metric_type = %metric_type,
                destination = %sender.name(),
                entries,
                error = %e,
                "Error while sending metric data"
            );
        }
    }
}
