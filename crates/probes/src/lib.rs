//! # Probes
//!
//! Instrumentation hooks feeding metric buffers.
//!
//! Responsibilities:
//! - Expose duration / signal / queue-length probes to instrumentation points
//! - Notify registered observers of every probe event
//! - Write probe values into per-metric [`MetricBuffer`]s
//!
//! ## Usage Example
//!
//! ```ignore
//! use probes::ProbeRegistry;
//!
//! let registry = ProbeRegistry::new();
//! let buffers = registry.attach_buffers();
//!
//! registry.processing_time.record(elapsed, "Sales.OrderPlaced");
//! registry.retries.signal("Sales.OrderPlaced");
//! registry.queue_length.signal("Sales.Input", 17);
//! ```

mod buffer;
mod probe;
mod registry;

pub use buffer::{metric_type_name, MetricBuffer};
pub use probe::{
    DurationEvent, DurationProbe, ProbeEvent, QueueLengthEvent, QueueLengthProbe, SignalEvent,
    SignalProbe,
};
pub use registry::{
    ProbeObserver, ProbeRegistry, CRITICAL_TIME, PROCESSING_TIME, QUEUE_LENGTH, RETRIES,
};
