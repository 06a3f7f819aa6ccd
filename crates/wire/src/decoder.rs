//! Payload decoders

use std::collections::{btree_map, BTreeMap, HashMap};

use bytes::Buf;

use crate::{MessagePool, TaggedMessage, TimestampedValue, WireError, VERSION};

/// Bounds-checked little-endian reader
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<(), WireError> {
        if self.buf.remaining() < needed {
            return Err(WireError::Truncated {
                field,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn i64(&mut self, field: &'static str) -> Result<i64, WireError> {
        self.ensure(field, 8)?;
        Ok(self.buf.get_i64_le())
    }

    fn i32(&mut self, field: &'static str) -> Result<i32, WireError> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_i32_le())
    }

    fn count(&mut self, field: &'static str) -> Result<usize, WireError> {
        let value = self.i32(field)?;
        usize::try_from(value).map_err(|_| WireError::NegativeCount { field, value })
    }

    fn bytes(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], WireError> {
        self.ensure(field, len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Read a delta and apply it to `base`
    fn ticks(&mut self, base: i64) -> Result<i64, WireError> {
        let delta = self.i32("delta")?;
        base.checked_add(i64::from(delta))
            .ok_or(WireError::TimestampOverflow { base, delta })
    }

    /// Read and check the version, then return the base ticks
    fn header(&mut self) -> Result<i64, WireError> {
        let version = self.i64("version")?;
        if version != VERSION {
            return Err(WireError::UnsupportedVersion(version));
        }
        self.i64("base ticks")
    }
}

/// Decode a long value payload into `(ticks, value)` pairs in encoded order
pub fn decode_long_values(payload: &[u8]) -> Result<Vec<TimestampedValue>, WireError> {
    let mut reader = Reader::new(payload);
    let base = reader.header()?;
    let count = reader.count("entry count")?;

    let mut values = Vec::with_capacity(count.min(payload.len() / 12));
    for _ in 0..count {
        let ticks = reader.ticks(base)?;
        let value = reader.i64("value")?;
        values.push(TimestampedValue { ticks, value });
    }
    Ok(values)
}

/// Decode an occurrence payload into its ticks
pub fn decode_occurrences(payload: &[u8]) -> Result<Vec<i64>, WireError> {
    let mut reader = Reader::new(payload);
    let base = reader.header()?;
    let count = reader.count("entry count")?;

    let mut ticks = Vec::with_capacity(count.min(payload.len() / 4));
    for _ in 0..count {
        ticks.push(reader.ticks(base)?);
    }
    Ok(ticks)
}

/// Decode a tagged long value payload into per-tag messages leased from `pool`.
///
/// A tag whose values exceed one message's capacity spans several messages.
/// The caller owns the returned messages and should release them to `pool`.
/// On error every message leased so far is returned to the pool.
pub fn decode_tagged(
    payload: &[u8],
    pool: &MessagePool,
) -> Result<Vec<Box<TaggedMessage>>, WireError> {
    let mut output = Vec::new();
    let mut active = BTreeMap::new();

    match decode_tagged_into(payload, pool, &mut active, &mut output) {
        Ok(()) => {
            output.extend(active.into_values());
            Ok(output)
        }
        Err(e) => {
            pool.release_all(output);
            pool.release_all(active.into_values());
            Err(e)
        }
    }
}

fn decode_tagged_into(
    payload: &[u8],
    pool: &MessagePool,
    active: &mut BTreeMap<i32, Box<TaggedMessage>>,
    output: &mut Vec<Box<TaggedMessage>>,
) -> Result<(), WireError> {
    let mut reader = Reader::new(payload);
    let base = reader.header()?;

    let tag_count = reader.count("tag count")?;
    let mut tags = HashMap::with_capacity(tag_count.min(1024));
    for _ in 0..tag_count {
        let id = reader.i32("tag id")?;
        let len = reader.count("tag length")?;
        let name = std::str::from_utf8(reader.bytes("tag name", len)?)
            .map_err(|_| WireError::InvalidUtf8(id))?;
        tags.insert(id, name);
    }

    let count = reader.count("entry count")?;
    for _ in 0..count {
        let ticks = reader.ticks(base)?;
        let tag_id = reader.i32("tag id")?;
        let value = reader.i64("value")?;

        let message = match active.entry(tag_id) {
            btree_map::Entry::Occupied(slot) => slot.into_mut(),
            btree_map::Entry::Vacant(slot) => {
                let name = tags.get(&tag_id).ok_or(WireError::UnknownTag(tag_id))?;
                let mut fresh = pool.lease();
                fresh.set_tag_value(name);
                slot.insert(fresh)
            }
        };

        if message.is_full() {
            let mut fresh = pool.lease();
            fresh.set_tag_value(message.tag_value());
            output.push(std::mem::replace(message, fresh));
        }
        let recorded = message.try_record(ticks, value);
        debug_assert!(recorded, "fresh message refused a value for tag {tag_id}");
    }

    Ok(())
}
