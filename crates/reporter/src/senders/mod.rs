//! Sender implementations
//!
//! Contains the monitoring envelope sender, the log dispatcher, UdpSender and FileSender.

mod file;
mod log;
mod monitoring;
mod udp;

pub use self::file::FileSender;
pub use self::log::LogDispatcher;
pub use self::monitoring::MonitoringSender;
pub use self::udp::UdpSender;

use std::sync::Arc;

use bytes::Bytes;
use contracts::{ContractError, HostInformation, PayloadSender, ReportingConfig, SenderConfig};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::ReporterError;

/// Monitoring sender writing its messages to the log
pub type LogSender = MonitoringSender<LogDispatcher>;

/// Sender selected by configuration
pub enum AnySender {
    /// Monitoring envelope written to the log
    Log(LogSender),
    /// Raw payload as UDP datagram
    Udp(UdpSender),
    /// Raw payload as file
    File(FileSender),
}

impl PayloadSender for AnySender {
    fn name(&self) -> &str {
        match self {
            AnySender::Log(sender) => sender.name(),
            AnySender::Udp(sender) => sender.name(),
            AnySender::File(sender) => sender.name(),
        }
    }

    async fn send(&self, payload: Bytes, cancel: CancellationToken) -> Result<(), ContractError> {
        match self {
            AnySender::Log(sender) => sender.send(payload, cancel).await,
            AnySender::Udp(sender) => sender.send(payload, cancel).await,
            AnySender::File(sender) => sender.send(payload, cancel).await,
        }
    }
}

/// Create the configured sender for one metric stream
#[instrument(
    name = "reporter_create_sender",
    skip(config, host),
    fields(kind = config.sender.kind())
)]
pub async fn create_sender(
    config: &ReportingConfig,
    host: &HostInformation,
    metric_type: &str,
) -> Result<AnySender, ReporterError> {
    match &config.sender {
        SenderConfig::Log => {
            let dispatcher = Arc::new(LogDispatcher::new("log"));
            Ok(AnySender::Log(MonitoringSender::new(
                dispatcher,
                config,
                host,
                metric_type,
            )))
        }
        SenderConfig::Udp {
            addr,
            max_packet_size,
        } => {
            let sender = UdpSender::from_addr(metric_type, addr, *max_packet_size)
                .await
                .map_err(|e| ReporterError::sender_creation(metric_type, e.to_string()))?;
            Ok(AnySender::Udp(sender))
        }
        SenderConfig::File { dir } => {
            let sender = FileSender::new(metric_type, dir)
                .map_err(|e| ReporterError::sender_creation(metric_type, e.to_string()))?;
            Ok(AnySender::File(sender))
        }
    }
}
