//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Metrics Reporter - buffers probe values and reports them as raw payloads
#[derive(Parser, Debug)]
#[command(
    name = "metrics-reporter",
    author,
    version,
    about = "In-process metrics buffering and reporting pipeline",
    long_about = "Buffers probe values in lock-free ring buffers and reports them in batches.\n\n\
                  Drives the pipeline with synthetic probe events, validates configuration \n\
                  files and decodes payloads written by the file sender."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "METRICS_REPORTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "METRICS_REPORTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the reporting pipeline with synthetic probe events
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration and message headers
    Info(InfoArgs),

    /// Decode payload files written by the file sender
    Decode(DecodeArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "reporting.toml",
        env = "METRICS_REPORTER_CONFIG"
    )]
    pub config: PathBuf,

    /// Run duration in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "10", env = "METRICS_REPORTER_DURATION")]
    pub duration_secs: u64,

    /// Number of concurrent synthetic producers
    #[arg(long, default_value = "4", env = "METRICS_REPORTER_PRODUCERS")]
    pub producers: usize,

    /// Probe events per second emitted by each producer
    #[arg(long, default_value = "1000", env = "METRICS_REPORTER_RATE")]
    pub rate: u64,

    /// Ring buffer capacity per metric type
    #[arg(long, default_value = "4096", env = "METRICS_REPORTER_BUFFER_CAPACITY")]
    pub buffer_capacity: usize,

    /// Override the Prometheus port from configuration (0 = disabled)
    #[arg(long, env = "METRICS_REPORTER_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "reporting.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "reporting.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the headers sent with every payload
    #[arg(long)]
    pub headers: bool,
}

/// Arguments for the `decode` command
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// Payload files to decode
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print every decoded value, not only per-tag summaries
    #[arg(long)]
    pub values: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
