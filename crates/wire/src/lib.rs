//! # Wire
//!
//! Binary payload formats for buffered metric entries.
//!
//! All integers are little-endian. Every format starts with an `i64` version
//! (currently `1`) followed by the `i64` base ticks of the batch; per-entry
//! timestamps are `i32` deltas from that base.
//!
//! | format | body after the header |
//! |---|---|
//! | long value | `i32 count`, then `(i32 delta, i64 value)` per entry |
//! | occurrence | `i32 count`, then `i32 delta` per entry |
//! | tagged long value | `i32 tag_count`, `(i32 id, i32 len, utf8)` per tag, `i32 count`, then `(i32 delta, i32 tag_id, i64 value)` per entry |

mod decoder;
mod error;
mod message;
mod tag_table;
mod writer;

pub use decoder::{decode_long_values, decode_occurrences, decode_tagged};
pub use error::WireError;
pub use message::{MessagePool, TaggedMessage, TimestampedValue, MAX_ENTRIES};
pub use tag_table::{TagTable, UNTAGGED};
pub use writer::{
    LongValueWriter, OccurrenceWriter, PayloadWriter, TaggedLongValueWriter, VERSION,
};
