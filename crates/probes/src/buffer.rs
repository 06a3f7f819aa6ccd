//! MetricBuffer - ring buffer plus the tagged writer of one metric stream

use std::sync::Arc;

use ring_buffer::{write_with_retry, RingBuffer};
use wire::TaggedLongValueWriter;

/// Metric type name of a probe: the probe name without spaces
pub fn metric_type_name(probe_name: &str) -> String {
    probe_name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Buffer of one metric stream.
///
/// Tags are interned through the stream's own writer, so the ids stored in
/// the ring always resolve in the payloads that writer produces.
#[derive(Debug, Clone)]
pub struct MetricBuffer {
    metric_type: Arc<str>,
    buffer: Arc<RingBuffer>,
    writer: Arc<TaggedLongValueWriter>,
}

impl MetricBuffer {
    /// Create a buffer with the default ring capacity
    pub fn new(metric_type: impl Into<Arc<str>>) -> Self {
        Self::with_ring(metric_type, RingBuffer::new())
    }

    /// Create a buffer around an existing ring
    pub fn with_ring(metric_type: impl Into<Arc<str>>, ring: RingBuffer) -> Self {
        Self {
            metric_type: metric_type.into(),
            buffer: Arc::new(ring),
            writer: Arc::new(TaggedLongValueWriter::new()),
        }
    }

    /// Buffer `value` under `tag`; returns `false` if it was dropped
    pub fn record(&self, value: i64, tag: &str) -> bool {
        let tag_id = self.writer.get_tag_id(tag);
        write_with_retry(&self.buffer, &self.metric_type, value, tag_id)
    }

    pub fn metric_type(&self) -> &str {
        &self.metric_type
    }

    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.buffer
    }

    pub fn writer(&self) -> &Arc<TaggedLongValueWriter> {
        &self.writer
    }
}
