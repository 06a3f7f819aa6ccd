//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ReportingConfig, SenderConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Bytes of a tagged payload without entries (version, base, tag count, entry count)
const PAYLOAD_HEADER_BYTES: usize = 24;

/// Bytes per tagged entry (delta, tag id, value)
const ENTRY_BYTES: usize = 16;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    endpoint_name: String,
    metrics_address: String,
    sender: String,
    reporting_interval_ms: u64,
    flush_size: usize,
    max_flush_size: usize,
    max_parallel_consumers: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    endpoint_name: config.endpoint_name.clone(),
                    metrics_address: config.metrics_address.clone(),
                    sender: config.sender.kind().to_string(),
                    reporting_interval_ms: config.reporting_interval_ms,
                    flush_size: config.reporter.flush_size,
                    max_flush_size: config.reporter.max_flush_size,
                    max_parallel_consumers: config.reporter.max_parallel_consumers,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ReportingConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.reporter.flush_size > config.reporter.max_flush_size {
        warnings.push(format!(
            "reporter.flush_size ({}) exceeds reporter.max_flush_size ({}) - every flush is split into several payloads",
            config.reporter.flush_size, config.reporter.max_flush_size
        ));
    }

    if let SenderConfig::Udp {
        max_packet_size, ..
    } = &config.sender
    {
        let largest = PAYLOAD_HEADER_BYTES + config.reporter.max_flush_size * ENTRY_BYTES;
        if largest > *max_packet_size {
            warnings.push(format!(
                "payloads of reporter.max_flush_size entries need about {} bytes, more than max_packet_size ({}) - they will be rejected",
                largest, max_packet_size
            ));
        }
    }

    if config.instance_id().is_none() {
        warnings.push("instance_id is not set - the instance id header is omitted".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Endpoint: {}", summary.endpoint_name);
            println!("  Collector: {}", summary.metrics_address);
            println!("  Sender: {}", summary.sender);
            println!("  Reporting interval: {} ms", summary.reporting_interval_ms);
            println!(
                "  Flush size: {} (max {}, {} parallel)",
                summary.flush_size, summary.max_flush_size, summary.max_parallel_consumers
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
