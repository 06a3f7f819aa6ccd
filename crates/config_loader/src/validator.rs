//! 配置校验模块
//!
//! 校验规则：
//! - endpoint_name / metrics_address 非空
//! - 0 < reporting_interval_ms <= MAX_REPORTING_INTERVAL_MS, time_to_be_received_ms > 0
//! - flush_size / max_flush_size / max_parallel_consumers >= 1
//! - sender 必填字段合法

use std::net::SocketAddr;

use contracts::{ticks::TICKS_PER_MILLISECOND, ContractError, ReportingConfig, SenderConfig};

/// 单个批次的 tick 差值以 i32 编码，上报间隔不能超过其可表示范围（约 214 秒）
pub const MAX_REPORTING_INTERVAL_MS: u64 = (i32::MAX as i64 / TICKS_PER_MILLISECOND) as u64;

/// 校验 ReportingConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ReportingConfig) -> Result<(), ContractError> {
    validate_names(config)?;
    validate_durations(config)?;
    validate_reporter(config)?;
    validate_sender(config)?;
    Ok(())
}

/// 校验名称非空
fn validate_names(config: &ReportingConfig) -> Result<(), ContractError> {
    if config.endpoint_name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "endpoint_name",
            "endpoint_name cannot be empty",
        ));
    }
    if config.metrics_address.trim().is_empty() {
        return Err(ContractError::config_validation(
            "metrics_address",
            "metrics_address cannot be empty",
        ));
    }
    Ok(())
}

/// 校验时间参数
fn validate_durations(config: &ReportingConfig) -> Result<(), ContractError> {
    if config.reporting_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "reporting_interval_ms",
            "reporting_interval_ms must be > 0",
        ));
    }
    if config.reporting_interval_ms > MAX_REPORTING_INTERVAL_MS {
        return Err(ContractError::config_validation(
            "reporting_interval_ms",
            format!("reporting_interval_ms must be <= {MAX_REPORTING_INTERVAL_MS}"),
        ));
    }
    if config.time_to_be_received_ms == 0 {
        return Err(ContractError::config_validation(
            "time_to_be_received_ms",
            "time_to_be_received_ms must be > 0",
        ));
    }
    Ok(())
}

/// 校验 reporter 参数
fn validate_reporter(config: &ReportingConfig) -> Result<(), ContractError> {
    let reporter = &config.reporter;
    for (field, value) in [
        ("reporter.flush_size", reporter.flush_size),
        ("reporter.max_flush_size", reporter.max_flush_size),
        (
            "reporter.max_parallel_consumers",
            reporter.max_parallel_consumers,
        ),
    ] {
        if value == 0 {
            return Err(ContractError::config_validation(
                field,
                format!("{field} must be >= 1"),
            ));
        }
    }
    Ok(())
}

/// 校验 sender 配置
fn validate_sender(config: &ReportingConfig) -> Result<(), ContractError> {
    match &config.sender {
        SenderConfig::Log => Ok(()),
        SenderConfig::Udp {
            addr,
            max_packet_size,
        } => {
            // 只接受 ip:port
            addr.parse::<SocketAddr>().map_err(|e| {
                ContractError::config_validation(
                    "sender.addr",
                    format!("invalid UDP address '{addr}': {e}"),
                )
            })?;
            if *max_packet_size == 0 {
                return Err(ContractError::config_validation(
                    "sender.max_packet_size",
                    "max_packet_size must be > 0",
                ));
            }
            Ok(())
        }
        SenderConfig::File { dir } => {
            if dir.as_os_str().is_empty() {
                return Err(ContractError::config_validation(
                    "sender.dir",
                    "file sender dir cannot be empty",
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn minimal_config() -> ReportingConfig {
        ReportingConfig::new("Sales", "Particular.Monitoring")
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_empty_endpoint_name() {
        let mut config = minimal_config();
        config.endpoint_name = "  ".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("endpoint_name cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_empty_metrics_address() {
        let mut config = minimal_config();
        config.metrics_address = String::new();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("metrics_address"), "got: {err}");
    }

    #[test]
    fn test_zero_interval() {
        let mut config = minimal_config();
        config.reporting_interval_ms = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("reporting_interval_ms must be > 0"), "got: {err}");
    }

    #[test]
    fn test_interval_beyond_delta_range() {
        let mut config = minimal_config();
        config.reporting_interval_ms = MAX_REPORTING_INTERVAL_MS;
        assert!(validate(&config).is_ok());

        config.reporting_interval_ms = MAX_REPORTING_INTERVAL_MS + 1;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("reporting_interval_ms must be <= 214748"), "got: {err}");
    }

    #[test]
    fn test_zero_flush_size() {
        let mut config = minimal_config();
        config.reporter.flush_size = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("reporter.flush_size must be >= 1"), "got: {err}");
    }

    #[test]
    fn test_invalid_udp_addr() {
        let mut config = minimal_config();
        config.sender = SenderConfig::Udp {
            addr: "collector".into(),
            max_packet_size: 1024,
        };
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("invalid UDP address"), "got: {err}");
    }

    #[test]
    fn test_empty_file_dir() {
        let mut config = minimal_config();
        config.sender = SenderConfig::File {
            dir: PathBuf::new(),
        };
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("dir cannot be empty"), "got: {err}");
    }
}
