//! Lock-free circular buffer with a per-slot publication fence.
//!
//! Positions are monotonically increasing `u64` counters:
//! - `next_to_write`: next position a writer may claim
//! - `next_to_consume`: first position not yet drained
//!
//! A position maps to slot `position & mask`; `position & !mask` is its epoch.
//! Each slot has a companion fence holding the entry's ticks once the entry is
//! fully written, and `0` while it is free or being written.

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use contracts::{ticks, Entry};
use crossbeam::utils::CachePadded;

/// Default number of slots
pub const DEFAULT_CAPACITY: usize = 4096;

/// Bounded MPSC ring buffer of timestamped entries
pub struct RingBuffer {
    /// Entry storage, written by the slot owner only
    slots: Box<[UnsafeCell<Entry>]>,
    /// Publication fence per slot (`0` = not visible)
    published: Box<[AtomicI64]>,
    mask: u64,
    next_to_write: CachePadded<AtomicU64>,
    next_to_consume: CachePadded<AtomicU64>,
    /// Single-consumer guard
    consuming: AtomicBool,
    clock: ticks::Clock,
}

// SAFETY: a slot is written only by the writer that claimed its position through
// the CAS on `next_to_write`, and read only by the consumer after observing the
// slot's fence with Acquire ordering. The consumer releases a slot by zeroing
// the fence and then advancing `next_to_consume` with Release ordering, which
// writers load with Acquire before claiming positions.
unsafe impl Sync for RingBuffer {}
unsafe impl Send for RingBuffer {}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("written", &self.written())
            .field("consumed", &self.consumed())
            .finish()
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    /// Create a buffer with [`DEFAULT_CAPACITY`] slots stamped by the wall clock
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer with at least `capacity` slots (rounded up to a power of two)
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_clock(capacity, ticks::now)
    }

    /// Create a default-sized buffer stamped by `clock`
    pub fn with_clock(clock: ticks::Clock) -> Self {
        Self::with_capacity_and_clock(DEFAULT_CAPACITY, clock)
    }

    /// Create a buffer with at least `capacity` slots stamped by `clock`
    pub fn with_capacity_and_clock(capacity: usize, clock: ticks::Clock) -> Self {
        let capacity = capacity.max(2).next_power_of_two();

        Self {
            slots: (0..capacity).map(|_| UnsafeCell::new(Entry::default())).collect(),
            published: (0..capacity).map(|_| AtomicI64::new(0)).collect(),
            mask: capacity as u64 - 1,
            next_to_write: CachePadded::new(AtomicU64::new(0)),
            next_to_consume: CachePadded::new(AtomicU64::new(0)),
            consuming: AtomicBool::new(false),
            clock,
        }
    }

    /// Number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Total positions claimed by writers so far
    #[inline]
    pub fn written(&self) -> u64 {
        self.next_to_write.load(Ordering::Acquire)
    }

    /// Total positions drained so far
    #[inline]
    pub fn consumed(&self) -> u64 {
        self.next_to_consume.load(Ordering::Acquire)
    }

    /// Claimed but not yet drained entries.
    ///
    /// Advisory only: concurrent writers may make it stale immediately.
    #[inline]
    pub fn roughly_estimate_items_to_consume(&self) -> u64 {
        let write = self.next_to_write.load(Ordering::Relaxed);
        let consume = self.next_to_consume.load(Ordering::Relaxed);
        write.saturating_sub(consume)
    }

    /// Try to append a value.
    ///
    /// Returns `false` when `capacity` entries are outstanding; the value is not written.
    pub fn try_write(&self, value: i64, tag: i32) -> bool {
        let capacity = self.capacity() as u64;
        let mut position = self.next_to_write.load(Ordering::Relaxed);

        loop {
            let consume = self.next_to_consume.load(Ordering::Acquire);
            // A stale `position` below `consume` falls through to the CAS, which refreshes it.
            if position.saturating_sub(consume) >= capacity {
                return false;
            }

            match self.next_to_write.compare_exchange_weak(
                position,
                position + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => position = actual,
            }
        }

        let slot = (position & self.mask) as usize;
        let ticks = (self.clock)();

        // SAFETY: `position` was claimed exclusively above and lies less than
        // `capacity` ahead of `next_to_consume`, so the consumer has released
        // this slot and no other writer owns it.
        unsafe {
            *self.slots[slot].get() = Entry::new(ticks, value, tag);
        }

        // Fence must be non-zero to publish, even for a clock returning 0.
        self.published[slot].store(ticks.max(1), Ordering::Release);
        true
    }

    /// Drain at most `max_count` published entries as one contiguous chunk.
    ///
    /// `on_chunk` is called at most once, with a slice that never crosses the
    /// physical end of the array (the remainder is returned by the next call).
    /// Drained slots are cleared before the consume position advances.
    ///
    /// Returns the number of drained entries. Returns `0` without calling
    /// `on_chunk` when nothing is published at the consume position, or when
    /// another thread is consuming concurrently.
    pub fn consume<F>(&self, max_count: usize, on_chunk: F) -> usize
    where
        F: FnOnce(&mut [Entry]),
    {
        if max_count == 0
            || self
                .consuming
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
        {
            return 0;
        }
        let _guard = ConsumeGuard(&self.consuming);

        let consume = self.next_to_consume.load(Ordering::Relaxed);
        let write = self.next_to_write.load(Ordering::Acquire);
        let start = (consume & self.mask) as usize;
        let epoch = consume & !self.mask;

        let limit = (write - consume)
            .min(max_count as u64)
            .min((self.capacity() - start) as u64) as usize;

        let mut len = 0;
        while len < limit
            && (consume + len as u64) & !self.mask == epoch
            && self.published[start + len].load(Ordering::Acquire) != 0
        {
            len += 1;
        }

        if len == 0 {
            return 0;
        }

        // SAFETY: slots [start, start + len) were published (Acquire above pairs
        // with the writers' Release) and are not reusable by writers until
        // `next_to_consume` advances. `consuming` makes this the only reader.
        let chunk = unsafe {
            let first = UnsafeCell::raw_get(self.slots.as_ptr().add(start));
            std::slice::from_raw_parts_mut(first, len)
        };

        on_chunk(&mut *chunk);

        for entry in chunk.iter_mut() {
            *entry = Entry::default();
        }
        for fence in &self.published[start..start + len] {
            fence.store(0, Ordering::Relaxed);
        }

        self.next_to_consume
            .fetch_add(len as u64, Ordering::Release);
        len
    }
}

/// Resets the single-consumer flag, also when the chunk callback panics.
struct ConsumeGuard<'a>(&'a AtomicBool);

impl Drop for ConsumeGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn fixed_clock() -> i64 {
        42
    }

    fn drain_values(buffer: &RingBuffer, max: usize) -> Vec<i64> {
        let mut values = Vec::new();
        buffer.consume(max, |chunk| values.extend(chunk.iter().map(|e| e.value)));
        values
    }

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        assert_eq!(RingBuffer::with_capacity(1000).capacity(), 1024);
        assert_eq!(RingBuffer::with_capacity(16).capacity(), 16);
        assert_eq!(RingBuffer::new().capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_write_and_consume_several_entries() {
        let buffer = RingBuffer::with_clock(fixed_clock);
        assert!(buffer.try_write(1, 0));
        assert!(buffer.try_write(2, 7));
        assert!(buffer.try_write(3, 0));

        let mut seen = Vec::new();
        let consumed = buffer.consume(10, |chunk| seen.extend_from_slice(chunk));

        assert_eq!(consumed, 3);
        assert_eq!(seen[0], Entry::new(42, 1, 0));
        assert_eq!(seen[1], Entry::new(42, 2, 7));
        assert_eq!(seen[2], Entry::new(42, 3, 0));
        assert_eq!(buffer.roughly_estimate_items_to_consume(), 0);
    }

    #[test]
    fn test_consume_empty_does_not_call_back() {
        let buffer = RingBuffer::with_capacity(8);
        let mut called = false;
        assert_eq!(buffer.consume(8, |_| called = true), 0);
        assert!(!called);
    }

    #[test]
    fn test_full_buffer_rejects_write() {
        let buffer = RingBuffer::new();
        for i in 0..DEFAULT_CAPACITY as i64 {
            assert!(buffer.try_write(i, 0), "write {} should succeed", i);
        }
        assert!(!buffer.try_write(-1, 0));
        assert_eq!(
            buffer.roughly_estimate_items_to_consume(),
            DEFAULT_CAPACITY as u64
        );
    }

    #[test]
    fn test_full_buffer_accepts_again_after_consume() {
        let buffer = RingBuffer::with_capacity(8);
        for round in 0..5 {
            for i in 0..8 {
                assert!(buffer.try_write(round * 8 + i, 0));
            }
            assert!(!buffer.try_write(0, 0));
            assert_eq!(buffer.consume(8, |chunk| assert_eq!(chunk.len(), 8)), 8);
        }
        assert_eq!(buffer.written(), 40);
        assert_eq!(buffer.consumed(), 40);
    }

    #[test]
    fn test_consume_respects_max_count() {
        let buffer = RingBuffer::with_capacity(16);
        for i in 0..10 {
            buffer.try_write(i, 0);
        }
        assert_eq!(drain_values(&buffer, 4), vec![0, 1, 2, 3]);
        assert_eq!(buffer.roughly_estimate_items_to_consume(), 6);
        assert_eq!(drain_values(&buffer, 100), vec![4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_chunk_does_not_cross_array_end() {
        let buffer = RingBuffer::new();
        let size = DEFAULT_CAPACITY as i64;

        // Move the cursors to two slots before the physical end.
        for i in 0..size - 2 {
            assert!(buffer.try_write(i, 0));
        }
        assert_eq!(buffer.consume(DEFAULT_CAPACITY, |_| {}), DEFAULT_CAPACITY - 2);

        for v in 1..=4 {
            assert!(buffer.try_write(v, 0));
        }

        assert_eq!(drain_values(&buffer, DEFAULT_CAPACITY), vec![1, 2]);
        assert_eq!(drain_values(&buffer, DEFAULT_CAPACITY), vec![3, 4]);
        assert_eq!(buffer.roughly_estimate_items_to_consume(), 0);
    }

    #[test]
    fn test_full_then_partial_refill_partitions() {
        let buffer = RingBuffer::new();
        let size = DEFAULT_CAPACITY;

        for i in 0..size as i64 {
            assert!(buffer.try_write(i, 0));
        }
        assert_eq!(buffer.consume(size, |chunk| assert_eq!(chunk.len(), size)), size);

        for i in 0..(size - 2) as i64 {
            assert!(buffer.try_write(i, 0));
        }
        let first = buffer.consume(size, |_| {});
        assert_eq!(first, size - 2);
        assert_eq!(buffer.consume(size, |_| {}), 0);
    }

    #[test]
    fn test_consumed_slots_are_cleared() {
        let buffer = RingBuffer::with_capacity(4);
        for i in 0..4 {
            buffer.try_write(i + 1, 3);
        }
        buffer.consume(4, |chunk| {
            assert!(chunk.iter().all(Entry::is_published));
        });

        for fence in buffer.published.iter() {
            assert_eq!(fence.load(Ordering::Relaxed), 0);
        }
    }

    #[test]
    fn test_estimate_tracks_writes_and_consumes() {
        let buffer = RingBuffer::with_capacity(32);
        assert_eq!(buffer.roughly_estimate_items_to_consume(), 0);
        for i in 0..10 {
            buffer.try_write(i, 0);
        }
        assert_eq!(buffer.roughly_estimate_items_to_consume(), 10);
        buffer.consume(3, |_| {});
        assert_eq!(buffer.roughly_estimate_items_to_consume(), 7);
    }

    #[test]
    fn test_zero_clock_still_publishes() {
        let buffer = RingBuffer::with_capacity_and_clock(4, || 0);
        assert!(buffer.try_write(5, 0));
        assert_eq!(drain_values(&buffer, 4), vec![5]);
    }

    #[test]
    fn test_concurrent_producers() {
        const PER_PRODUCER: i64 = 50_000;
        let buffer = Arc::new(RingBuffer::with_capacity(1024));

        let producers: Vec<_> = (0..2)
            .map(|p| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let value = p * PER_PRODUCER + i;
                        while !buffer.try_write(value, p as i32) {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let mut seen = HashSet::new();
        while seen.len() < (2 * PER_PRODUCER) as usize {
            let drained = buffer.consume(256, |chunk| {
                for entry in chunk.iter() {
                    assert!(entry.ticks > 0);
                    assert_eq!(entry.tag as i64, entry.value / PER_PRODUCER);
                    assert!(seen.insert(entry.value), "duplicate {}", entry.value);
                }
            });
            if drained == 0 {
                thread::yield_now();
            }
        }

        for producer in producers {
            producer.join().unwrap();
        }
        assert_eq!(buffer.roughly_estimate_items_to_consume(), 0);
    }

    #[test]
    fn test_concurrent_consume_is_rejected() {
        let buffer = RingBuffer::with_capacity(8);
        buffer.try_write(1, 0);
        buffer.try_write(2, 0);

        let outer = buffer.consume(1, |_| {
            // Re-entrant consume sees the guard and backs off.
            assert_eq!(buffer.consume(8, |_| panic!("must not be called")), 0);
        });
        assert_eq!(outer, 1);
        assert_eq!(drain_values(&buffer, 8), vec![2]);
    }
}
