//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the metrics pipeline.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Entries are stamped with wall-clock ticks (100 ns units since 0001-01-01 UTC)
//! - A tick value of `0` is reserved as the "not yet published" marker

mod config;
mod dispatch;
mod entry;
mod error;
pub mod headers;
mod host;
mod sender;
pub mod ticks;

pub use config::*;
pub use dispatch::*;
pub use entry::{sort_by_ticks, Entry};
pub use error::*;
pub use host::HostInformation;
pub use sender::*;
