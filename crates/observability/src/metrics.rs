//! 上报管道指标收集模块
//!
//! 记录 reporter / 缓冲区自身的运行指标，并在内存中聚合上报值的统计。

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// 记录一次成功发送的 payload
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_payload_sent;
///
/// sender.send(payload.clone(), token).await?;
/// record_payload_sent("ProcessingTime", payload.len(), entries);
/// ```
pub fn record_payload_sent(metric_type: &str, bytes: usize, entries: usize) {
    counter!(
        "metrics_reporter_payloads_sent_total",
        "metric_type" => metric_type.to_string()
    )
    .increment(1);

    counter!(
        "metrics_reporter_entries_flushed_total",
        "metric_type" => metric_type.to_string()
    )
    .increment(entries as u64);

    histogram!(
        "metrics_reporter_payload_bytes",
        "metric_type" => metric_type.to_string()
    )
    .record(bytes as f64);
}

/// 记录一次发送失败
pub fn record_payload_failed(metric_type: &str) {
    counter!(
        "metrics_reporter_payload_failures_total",
        "metric_type" => metric_type.to_string()
    )
    .increment(1);
}

/// 记录因缓冲区满而丢弃的数据点
pub fn record_buffer_dropped(metric_type: &str) {
    counter!(
        "metrics_reporter_buffer_dropped_total",
        "metric_type" => metric_type.to_string()
    )
    .increment(1);
}

/// 记录缓冲区待消费深度
pub fn record_buffer_depth(metric_type: &str, depth: u64) {
    gauge!(
        "metrics_reporter_buffer_depth",
        "metric_type" => metric_type.to_string()
    )
    .set(depth as f64);
}

/// 上报值聚合器
///
/// 按 metric type 在内存中聚合数值，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ReportStatsAggregator {
    /// 各 metric type 的数值统计
    pub per_metric: BTreeMap<String, RunningStats>,
    /// 丢弃的数据点
    pub dropped: u64,
}

impl ReportStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个数值
    pub fn record(&mut self, metric_type: &str, value: f64) {
        self.per_metric
            .entry(metric_type.to_string())
            .or_default()
            .push(value);
    }

    /// 记录丢弃
    pub fn record_dropped(&mut self, count: u64) {
        self.dropped += count;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total_values: self.per_metric.values().map(RunningStats::count).sum(),
            dropped: self.dropped,
            per_metric: self
                .per_metric
                .iter()
                .map(|(name, stats)| (name.clone(), StatsSummary::from(stats)))
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct ReportSummary {
    pub total_values: u64,
    pub dropped: u64,
    pub per_metric: BTreeMap<String, StatsSummary>,
}

impl std::fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Reporting Summary ===")?;
        writeln!(f, "Total values: {}", self.total_values)?;
        writeln!(f, "Dropped values: {}", self.dropped)?;
        for (metric_type, stats) in &self.per_metric {
            writeln!(f, "  {}: {}", metric_type, stats)?;
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_summary() {
        let mut aggregator = ReportStatsAggregator::new();
        aggregator.record("ProcessingTime", 10.0);
        aggregator.record("ProcessingTime", 20.0);
        aggregator.record("Retries", 1.0);
        aggregator.record_dropped(3);

        let summary = aggregator.summary();
        assert_eq!(summary.total_values, 3);
        assert_eq!(summary.dropped, 3);
        assert_eq!(summary.per_metric["ProcessingTime"].count, 2);
        assert!((summary.per_metric["ProcessingTime"].mean - 15.0).abs() < 1e-10);

        let text = summary.to_string();
        assert!(text.contains("Retries"));

        aggregator.reset();
        assert_eq!(aggregator.summary().total_values, 0);
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        // metrics 门面在未安装 recorder 时应静默忽略
        record_payload_sent("QueueLength", 128, 4);
        record_payload_failed("QueueLength");
        record_buffer_dropped("QueueLength");
        record_buffer_depth("QueueLength", 7);
    }
}
