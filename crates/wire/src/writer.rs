//! Payload writers
//!
//! Every writer sorts the batch by ticks in place before encoding, so the
//! first entry provides the base ticks and all deltas are non-negative.

use bytes::{BufMut, BytesMut};
use contracts::{sort_by_ticks, Entry};

use crate::TagTable;

/// Current version of every format
pub const VERSION: i64 = 1;

/// Encoder of a drained batch into a payload
pub trait PayloadWriter: Send + Sync {
    /// Append the encoded batch to `out`. May reorder `entries`.
    fn write(&self, entries: &mut [Entry], out: &mut BytesMut);
}

impl<F> PayloadWriter for F
where
    F: Fn(&mut [Entry], &mut BytesMut) + Send + Sync,
{
    fn write(&self, entries: &mut [Entry], out: &mut BytesMut) {
        self(entries, out)
    }
}

/// Sort `entries` and write the common header; returns the base ticks.
fn write_header(entries: &mut [Entry], out: &mut BytesMut) -> i64 {
    sort_by_ticks(entries);
    let base = entries.first().map(|e| e.ticks).unwrap_or_default();

    out.put_i64_le(VERSION);
    out.put_i64_le(base);
    base
}

/// Delta from the batch base. Truncated to 32 bits: valid for batches spanning
/// less than ~214 seconds.
#[inline]
fn delta(entry: &Entry, base: i64) -> i32 {
    (entry.ticks - base) as i32
}

/// Plain `(ticks, value)` writer
#[derive(Debug, Clone, Copy, Default)]
pub struct LongValueWriter;

impl PayloadWriter for LongValueWriter {
    fn write(&self, entries: &mut [Entry], out: &mut BytesMut) {
        out.reserve(20 + entries.len() * 12);
        let base = write_header(entries, out);

        out.put_i32_le(entries.len() as i32);
        for entry in entries.iter() {
            out.put_i32_le(delta(entry, base));
            out.put_i64_le(entry.value);
        }
    }
}

/// Occurrence writer: timestamps only
#[derive(Debug, Clone, Copy, Default)]
pub struct OccurrenceWriter;

impl PayloadWriter for OccurrenceWriter {
    fn write(&self, entries: &mut [Entry], out: &mut BytesMut) {
        out.reserve(20 + entries.len() * 4);
        let base = write_header(entries, out);

        out.put_i32_le(entries.len() as i32);
        for entry in entries.iter() {
            out.put_i32_le(delta(entry, base));
        }
    }
}

/// Tagged `(ticks, tag, value)` writer owning the tag dictionary of its stream
#[derive(Debug, Default)]
pub struct TaggedLongValueWriter {
    tags: TagTable,
}

impl TaggedLongValueWriter {
    /// Create a writer with an empty tag table
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `tag`, to be stored in buffered entries
    pub fn get_tag_id(&self, tag: &str) -> i32 {
        self.tags.get_tag_id(tag)
    }

    /// The writer's tag table
    pub fn tags(&self) -> &TagTable {
        &self.tags
    }
}

impl PayloadWriter for TaggedLongValueWriter {
    fn write(&self, entries: &mut [Entry], out: &mut BytesMut) {
        out.reserve(24 + entries.len() * 16);
        let base = write_header(entries, out);

        let mut ids: Vec<i32> = entries.iter().map(|e| e.tag).collect();
        ids.sort_unstable();
        ids.dedup();
        self.tags.write(&ids, out);

        out.put_i32_le(entries.len() as i32);
        for entry in entries.iter() {
            out.put_i32_le(delta(entry, base));
            out.put_i32_le(entry.tag);
            out.put_i64_le(entry.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(writer: &dyn PayloadWriter, entries: &mut [Entry]) -> Vec<u8> {
        let mut out = BytesMut::new();
        writer.write(entries, &mut out);
        out.to_vec()
    }

    struct Expected(Vec<u8>);

    impl Expected {
        fn new() -> Self {
            Self(Vec::new())
        }
        fn i64(mut self, v: i64) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn i32(mut self, v: i32) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn bytes(mut self, v: &[u8]) -> Self {
            self.0.extend_from_slice(v);
            self
        }
    }

    #[test]
    fn test_long_value_single_entry() {
        let mut entries = [Entry::new(2, 23544345345, 0)];
        let expected = Expected::new().i64(1).i64(2).i32(1).i32(0).i64(23544345345);
        assert_eq!(encode(&LongValueWriter, &mut entries), expected.0);
    }

    #[test]
    fn test_long_value_sorts_before_encoding() {
        let a = 23544345345;
        let b = 9876543210;
        let mut entries = [Entry::new(3, a, 0), Entry::new(2, b, 0)];

        let expected = Expected::new()
            .i64(1)
            .i64(2)
            .i32(2)
            .i32(0)
            .i64(b)
            .i32(1)
            .i64(a);
        assert_eq!(encode(&LongValueWriter, &mut entries), expected.0);
        // Sorted in place
        assert_eq!(entries[0].ticks, 2);
    }

    #[test]
    fn test_occurrence_writes_deltas_only() {
        let mut entries = [Entry::new(10, 5, 0), Entry::new(7, 6, 0), Entry::new(12, 7, 0)];
        let expected = Expected::new().i64(1).i64(7).i32(3).i32(0).i32(3).i32(5);
        assert_eq!(encode(&OccurrenceWriter, &mut entries), expected.0);
    }

    #[test]
    fn test_tagged_writes_referenced_tags_only() {
        let writer = TaggedLongValueWriter::new();
        let unused = writer.get_tag_id("Unused");
        let billed = writer.get_tag_id("Billed");
        let placed = writer.get_tag_id("Placed");
        assert_eq!((unused, billed, placed), (1, 2, 3));

        let mut entries = [
            Entry::new(105, 30, placed),
            Entry::new(100, 10, billed),
            Entry::new(103, 20, placed),
        ];

        let expected = Expected::new()
            .i64(1)
            .i64(100)
            .i32(2)
            .i32(billed)
            .i32(6)
            .bytes(b"Billed")
            .i32(placed)
            .i32(6)
            .bytes(b"Placed")
            .i32(3)
            .i32(0)
            .i32(billed)
            .i64(10)
            .i32(3)
            .i32(placed)
            .i64(20)
            .i32(5)
            .i32(placed)
            .i64(30);
        assert_eq!(encode(&writer, &mut entries), expected.0);
    }

    #[test]
    fn test_closure_is_a_payload_writer() {
        let writer = |entries: &mut [Entry], out: &mut BytesMut| {
            out.put_u32_le(entries.len() as u32);
        };
        let mut entries = [Entry::new(1, 1, 0), Entry::new(2, 2, 0)];
        assert_eq!(encode(&writer, &mut entries), 2u32.to_le_bytes().to_vec());
    }
}
