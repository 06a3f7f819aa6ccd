//! # Reporter
//!
//! 上报模块。
//!
//! 负责：
//! - 周期性 / 达到阈值时排空 `RingBuffer`
//! - 编码为 payload 并交给 `PayloadSender`
//! - 限制并发发送数量，停止时完整排空缓冲区

pub mod error;
pub mod metrics;
pub mod reporter;
pub mod senders;
pub mod session;

pub use contracts::{PayloadSender, ReportingConfig};
pub use error::ReporterError;
pub use metrics::{MetricsSnapshot, ReporterMetrics};
pub use reporter::{RawDataReporter, ReporterConfig, MAX_PARALLEL_CONSUMERS};
pub use senders::{
    create_sender, AnySender, FileSender, LogDispatcher, LogSender, MonitoringSender, UdpSender,
};
pub use session::ReportingSession;
