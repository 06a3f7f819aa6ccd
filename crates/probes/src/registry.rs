//! ProbeRegistry - the standard probe set and its wiring into buffers

use std::sync::Arc;

use ring_buffer::{RingBuffer, DEFAULT_CAPACITY};
use tracing::debug;

use crate::{
    metric_type_name, DurationEvent, DurationProbe, MetricBuffer, ProbeEvent, QueueLengthEvent,
    QueueLengthProbe, SignalEvent, SignalProbe,
};

pub const PROCESSING_TIME: &str = "Processing Time";
pub const CRITICAL_TIME: &str = "Critical Time";
pub const RETRIES: &str = "Retries";
pub const QUEUE_LENGTH: &str = "Queue Length";

/// Observer receiving every event of every probe
pub type ProbeObserver = Arc<dyn Fn(&ProbeEvent) + Send + Sync>;

/// The probes exposed to instrumentation points
#[derive(Debug)]
pub struct ProbeRegistry {
    pub processing_time: DurationProbe,
    pub critical_time: DurationProbe,
    pub retries: SignalProbe,
    pub queue_length: QueueLengthProbe,
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeRegistry {
    /// Create the standard probe set
    pub fn new() -> Self {
        Self {
            processing_time: DurationProbe::new(PROCESSING_TIME),
            critical_time: DurationProbe::new(CRITICAL_TIME),
            retries: SignalProbe::new(RETRIES),
            queue_length: QueueLengthProbe::new(QUEUE_LENGTH),
        }
    }

    /// Register `observer` on every probe
    pub fn register<F>(&self, observer: F)
    where
        F: Fn(&ProbeEvent) + Send + Sync + 'static,
    {
        let observer: ProbeObserver = Arc::new(observer);

        for probe in [&self.processing_time, &self.critical_time] {
            let observer = Arc::clone(&observer);
            let name: Arc<str> = Arc::from(probe.name());
            probe.register(move |event: &DurationEvent| {
                observer(&ProbeEvent::Duration {
                    probe: Arc::clone(&name),
                    event: event.clone(),
                })
            });
        }

        let signal_observer = Arc::clone(&observer);
        let name: Arc<str> = Arc::from(self.retries.name());
        self.retries.register(move |event: &SignalEvent| {
            signal_observer(&ProbeEvent::Signal {
                probe: Arc::clone(&name),
                event: event.clone(),
            })
        });

        let name: Arc<str> = Arc::from(self.queue_length.name());
        self.queue_length.register(move |event: &QueueLengthEvent| {
            observer(&ProbeEvent::QueueLength {
                probe: Arc::clone(&name),
                event: event.clone(),
            })
        });
    }

    /// Create one default-sized buffer per probe and route probe values into it
    pub fn attach_buffers(&self) -> Vec<MetricBuffer> {
        self.attach_buffers_with_capacity(DEFAULT_CAPACITY)
    }

    /// Create one buffer of `capacity` slots per probe and route probe values into it.
    ///
    /// Durations are buffered as whole milliseconds tagged by message type,
    /// retries as `1` tagged by message type, queue lengths tagged by queue.
    pub fn attach_buffers_with_capacity(&self, capacity: usize) -> Vec<MetricBuffer> {
        let new_buffer = |probe_name: &str| {
            MetricBuffer::with_ring(
                metric_type_name(probe_name),
                RingBuffer::with_capacity(capacity),
            )
        };

        let mut buffers = Vec::with_capacity(4);

        for probe in [&self.processing_time, &self.critical_time] {
            let buffer = new_buffer(probe.name());
            let sink = buffer.clone();
            probe.register(move |event: &DurationEvent| {
                let millis = i64::try_from(event.duration.as_millis()).unwrap_or(i64::MAX);
                sink.record(millis, &event.message_type);
            });
            buffers.push(buffer);
        }

        let buffer = new_buffer(self.retries.name());
        let sink = buffer.clone();
        self.retries.register(move |event: &SignalEvent| {
            sink.record(1, &event.message_type);
        });
        buffers.push(buffer);

        let buffer = new_buffer(self.queue_length.name());
        let sink = buffer.clone();
        self.queue_length.register(move |event: &QueueLengthEvent| {
            sink.record(event.length, &event.queue);
        });
        buffers.push(buffer);

        debug!(
            buffers = buffers.len(),
            capacity, "Attached metric buffers to probes"
        );
        buffers
    }
}
