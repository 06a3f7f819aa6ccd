//! Reporting configuration contracts shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of entries that triggers a flush (half of the default ring)
pub const DEFAULT_FLUSH_SIZE: usize = 2048;

/// Default upper bound of entries drained per payload
pub const DEFAULT_MAX_FLUSH_SIZE: usize = 4096;

/// Default number of payloads that may be in flight at once
pub const DEFAULT_MAX_PARALLEL_CONSUMERS: usize = 3;

/// Reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Name of the reporting endpoint
    pub endpoint_name: String,

    /// Address of the monitoring collector
    pub metrics_address: String,

    /// Optional instance id, sent as a header when non-empty
    #[serde(default)]
    pub instance_id: Option<String>,

    /// Reporting interval in milliseconds (maximum wait before a partial flush)
    #[serde(default = "default_reporting_interval_ms")]
    pub reporting_interval_ms: u64,

    /// Time-to-be-received of each payload in milliseconds
    #[serde(default = "default_time_to_be_received_ms")]
    pub time_to_be_received_ms: u64,

    /// Reporter tuning
    #[serde(default)]
    pub reporter: ReporterSettings,

    /// Payload sender
    #[serde(default)]
    pub sender: SenderConfig,

    /// Prometheus exporter port (disabled when absent)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_reporting_interval_ms() -> u64 {
    10_000
}

fn default_time_to_be_received_ms() -> u64 {
    7 * 24 * 60 * 60 * 1_000
}

impl ReportingConfig {
    /// Create a config with defaults for everything but the names
    pub fn new(endpoint_name: impl Into<String>, metrics_address: impl Into<String>) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            metrics_address: metrics_address.into(),
            instance_id: None,
            reporting_interval_ms: default_reporting_interval_ms(),
            time_to_be_received_ms: default_time_to_be_received_ms(),
            reporter: ReporterSettings::default(),
            sender: SenderConfig::default(),
            metrics_port: None,
        }
    }

    /// Reporting interval
    pub fn reporting_interval(&self) -> Duration {
        Duration::from_millis(self.reporting_interval_ms)
    }

    /// Time-to-be-received
    pub fn time_to_be_received(&self) -> Duration {
        Duration::from_millis(self.time_to_be_received_ms)
    }

    /// Instance id, if set and non-empty
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Reporter tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterSettings {
    /// Buffered entries that trigger a flush
    pub flush_size: usize,
    /// Maximum entries per payload
    pub max_flush_size: usize,
    /// Maximum payloads in flight
    pub max_parallel_consumers: usize,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            flush_size: DEFAULT_FLUSH_SIZE,
            max_flush_size: DEFAULT_MAX_FLUSH_SIZE,
            max_parallel_consumers: DEFAULT_MAX_PARALLEL_CONSUMERS,
        }
    }
}

/// Payload sender selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SenderConfig {
    /// Log every payload
    #[default]
    Log,
    /// Send every payload as one UDP datagram
    Udp {
        /// Target address (`host:port`)
        addr: String,
        /// Max datagram size
        #[serde(default = "default_max_packet_size")]
        max_packet_size: usize,
    },
    /// Write every payload to its own file
    File {
        /// Output directory
        dir: PathBuf,
    },
}

fn default_max_packet_size() -> usize {
    65_000
}

impl SenderConfig {
    /// Short sender kind name
    pub fn kind(&self) -> &'static str {
        match self {
            SenderConfig::Log => "log",
            SenderConfig::Udp { .. } => "udp",
            SenderConfig::File { .. } => "file",
        }
    }
}
