//! # Ring Buffer
//!
//! Fixed-capacity multi-producer / single-consumer buffer of [`Entry`] values.
//!
//! - Writers never block: [`RingBuffer::try_write`] either claims a slot or
//!   reports the buffer as full (the data point is dropped).
//! - The consumer drains contiguous chunks that never wrap past the physical
//!   end of the backing array.
//!
//! [`Entry`]: contracts::Entry

mod buffer;
mod retry;

pub use buffer::{RingBuffer, DEFAULT_CAPACITY};
pub use retry::{write_with_retry, MAX_WRITE_ATTEMPTS};
