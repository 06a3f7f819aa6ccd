//! TaggedMessage / MessagePool - receiver side decode model

use parking_lot::Mutex;

/// Capacity of one [`TaggedMessage`]
pub const MAX_ENTRIES: usize = 512;

/// Decoded data point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampedValue {
    pub ticks: i64,
    pub value: i64,
}

/// Fixed-capacity run of values that share one tag
#[derive(Debug)]
pub struct TaggedMessage {
    tag_value: String,
    entries: Vec<TimestampedValue>,
}

impl Default for TaggedMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl TaggedMessage {
    /// Create an empty message
    pub fn new() -> Self {
        Self {
            tag_value: String::new(),
            entries: Vec::with_capacity(MAX_ENTRIES),
        }
    }

    /// Tag shared by all values
    pub fn tag_value(&self) -> &str {
        &self.tag_value
    }

    pub fn set_tag_value(&mut self, tag: &str) {
        self.tag_value.clear();
        self.tag_value.push_str(tag);
    }

    /// Append a value; returns `false` when the message is full
    pub fn try_record(&mut self, ticks: i64, value: i64) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(TimestampedValue { ticks, value });
        true
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_ENTRIES
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded values in insertion order
    pub fn entries(&self) -> &[TimestampedValue] {
        &self.entries
    }

    /// Reset to the freshly created state, keeping allocations
    pub fn clear(&mut self) {
        self.tag_value.clear();
        self.entries.clear();
    }
}

/// Free list of [`TaggedMessage`] instances.
///
/// Leased messages should be handed back with [`MessagePool::release`]; a
/// message that is never released is simply not reused.
#[derive(Debug, Default)]
pub struct MessagePool {
    free: Mutex<Vec<Box<TaggedMessage>>>,
}

impl MessagePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop a free message, or allocate one if none is available
    pub fn lease(&self) -> Box<TaggedMessage> {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| Box::new(TaggedMessage::new()))
    }

    /// Clear `message` and return it to the free list
    pub fn release(&self, mut message: Box<TaggedMessage>) {
        message.clear();
        self.free.lock().push(message);
    }

    /// Release every message of a decoded batch
    pub fn release_all(&self, messages: impl IntoIterator<Item = Box<TaggedMessage>>) {
        for message in messages {
            self.release(message);
        }
    }

    /// Messages currently waiting in the free list
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }
}
