//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::{headers, HostInformation, ReportingConfig};
use probes::{metric_type_name, CRITICAL_TIME, PROCESSING_TIME, QUEUE_LENGTH, RETRIES};
use reporter::MonitoringSender;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    endpoint_name: String,
    metrics_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_id: Option<String>,
    reporting_interval_ms: u64,
    time_to_be_received_ms: u64,
    sender: String,
    metric_types: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, &HostInformation::local(), args.headers);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(
    config: &ReportingConfig,
    host: &HostInformation,
    with_headers: bool,
) -> ConfigInfo {
    let mut headers = BTreeMap::new();
    if with_headers {
        headers = MonitoringSender::<()>::base_headers(config, host);
        headers.insert(
            headers::CONTENT_TYPE.to_string(),
            headers::TAGGED_VALUE_CONTENT_TYPE.to_string(),
        );
    }

    ConfigInfo {
        endpoint_name: config.endpoint_name.clone(),
        metrics_address: config.metrics_address.clone(),
        instance_id: config.instance_id().map(str::to_string),
        reporting_interval_ms: config.reporting_interval_ms,
        time_to_be_received_ms: config.time_to_be_received_ms,
        sender: format!("{:?}", config.sender),
        metric_types: [PROCESSING_TIME, CRITICAL_TIME, RETRIES, QUEUE_LENGTH]
            .into_iter()
            .map(metric_type_name)
            .collect(),
        headers,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== Reporting Configuration ===\n");
    println!("Endpoint: {}", info.endpoint_name);
    println!("Collector: {}", info.metrics_address);
    if let Some(ref instance_id) = info.instance_id {
        println!("Instance: {}", instance_id);
    }
    println!("Reporting interval: {} ms", info.reporting_interval_ms);
    println!("Time to be received: {} ms", info.time_to_be_received_ms);
    println!("Sender: {}", info.sender);

    println!("\nMetric types ({}):", info.metric_types.len());
    for metric_type in &info.metric_types {
        println!("  - {}", metric_type);
    }

    if !info.headers.is_empty() {
        println!("\nHeaders (plus {} per metric type):", headers::METRIC_TYPE);
        for (key, value) in &info.headers {
            println!("  {}: {}", key, value);
        }
    }

    println!();
}
