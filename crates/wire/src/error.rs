//! Wire format errors

use thiserror::Error;

/// Payload decoding error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Version field is not a supported version
    #[error("unsupported payload version {0}")]
    UnsupportedVersion(i64),

    /// Payload ended before a field could be read
    #[error("payload truncated: needed {needed} bytes for {field}, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// An entry references a tag id missing from the payload's tag dictionary
    #[error("entry references unknown tag id {0}")]
    UnknownTag(i32),

    /// Tag name is not valid UTF-8
    #[error("tag {0} is not valid utf-8")]
    InvalidUtf8(i32),

    /// A count or length field is negative
    #[error("negative {field}: {value}")]
    NegativeCount { field: &'static str, value: i32 },

    /// Base ticks plus an entry delta does not fit in an i64
    #[error("timestamp overflow: base {base} + delta {delta}")]
    TimestampOverflow { base: i64, delta: i32 },
}
