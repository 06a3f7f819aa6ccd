//! Entry - a single buffered data point

/// Timestamped, optionally tagged numeric data point.
///
/// `ticks == 0` means the slot holding the entry has not been published yet;
/// real data always carries positive ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Wall-clock ticks at which the value was recorded
    pub ticks: i64,
    /// Recorded value
    pub value: i64,
    /// Interned tag id (`0` = untagged)
    pub tag: i32,
}

impl Entry {
    /// Create a new entry
    #[inline]
    pub const fn new(ticks: i64, value: i64, tag: i32) -> Self {
        Self { ticks, value, tag }
    }

    /// Whether the entry carries a published timestamp
    #[inline]
    pub const fn is_published(&self) -> bool {
        self.ticks != 0
    }
}

/// Sort a batch by ticks, ascending. Ties keep no particular order.
pub fn sort_by_ticks(entries: &mut [Entry]) {
    entries.sort_unstable_by_key(|e| e.ticks);
}
