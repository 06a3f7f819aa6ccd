//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    // Load and parse configuration
    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(port) = args.metrics_port {
        info!(port, "Overriding metrics port from CLI");
        config.metrics_port = (port != 0).then_some(port);
    }

    info!(
        endpoint = %config.endpoint_name,
        metrics_address = %config.metrics_address,
        sender = config.sender.kind(),
        reporting_interval_ms = config.reporting_interval_ms,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    // Initialize Metrics (optional)
    if let Some(port) = config.metrics_port {
        observability::init_metrics_only(port)?;
        info!("Metrics endpoint available on port {}", port);
    }

    let pipeline = Pipeline::new(PipelineConfig {
        reporting: config,
        duration: (args.duration_secs > 0).then(|| Duration::from_secs(args.duration_secs)),
        producers: args.producers,
        rate: args.rate,
        buffer_capacity: args.buffer_capacity,
    });

    info!("Starting pipeline...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    stats.print_summary();

    info!("Metrics reporter finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::ReportingConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Endpoint: {}", config.endpoint_name);
    println!("Collector: {}", config.metrics_address);
    if let Some(instance_id) = config.instance_id() {
        println!("Instance: {}", instance_id);
    }
    println!("Reporting interval: {} ms", config.reporting_interval_ms);
    println!("Time to be received: {} ms", config.time_to_be_received_ms);

    println!("\nReporter:");
    println!("  Flush size: {}", config.reporter.flush_size);
    println!("  Max flush size: {}", config.reporter.max_flush_size);
    println!(
        "  Max parallel consumers: {}",
        config.reporter.max_parallel_consumers
    );

    println!("\nSender: {:?}", config.sender);
    if let Some(port) = config.metrics_port {
        println!("Prometheus port: {}", port);
    }
    println!();
}
