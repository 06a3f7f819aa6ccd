//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 多生产者 e2e 测试（无丢失、无重复）
//! - 并发发送上限与配置驱动的会话

#[cfg(test)]
mod contract_tests {
    use contracts::{headers, ticks, Entry};

    #[test]
    fn test_contracts_snapshot() {
        assert_eq!(ticks::UNIX_EPOCH_TICKS, 621_355_968_000_000_000);
        assert_eq!(
            headers::TAGGED_VALUE_CONTENT_TYPE,
            "TaggedLongValueWriterOccurrence"
        );
        assert_eq!(wire::VERSION, 1);
        assert_eq!(wire::UNTAGGED, 0);
        assert!(!Entry::default().is_published());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{
        headers, ContractError, HostInformation, MessageDispatcher, OutgoingMessage,
        PayloadSender, ReportingConfig,
    };
    use parking_lot::Mutex;
    use probes::ProbeRegistry;
    use reporter::{MonitoringSender, RawDataReporter, ReporterConfig};
    use ring_buffer::RingBuffer;
    use tokio_util::sync::CancellationToken;
    use wire::{decode_long_values, decode_tagged, LongValueWriter, MessagePool};

    /// Collects payloads
    #[derive(Clone, Default)]
    struct CollectingSender {
        payloads: Arc<Mutex<Vec<Bytes>>>,
    }

    impl PayloadSender for CollectingSender {
        fn name(&self) -> &str {
            "collecting"
        }

        async fn send(&self, payload: Bytes, _cancel: CancellationToken) -> Result<(), ContractError> {
            self.payloads.lock().push(payload);
            Ok(())
        }
    }

    /// Slow sender tracking how many sends overlap
    #[derive(Clone, Default)]
    struct SlowSender {
        current: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
        payloads: Arc<Mutex<Vec<Bytes>>>,
    }

    impl PayloadSender for SlowSender {
        fn name(&self) -> &str {
            "slow"
        }

        async fn send(&self, payload: Bytes, _cancel: CancellationToken) -> Result<(), ContractError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.payloads.lock().push(payload);
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Captures dispatched monitoring messages
    #[derive(Default)]
    struct CapturingDispatcher {
        messages: Mutex<Vec<OutgoingMessage>>,
    }

    impl MessageDispatcher for CapturingDispatcher {
        async fn dispatch(
            &self,
            message: OutgoingMessage,
            _cancel: CancellationToken,
        ) -> Result<(), ContractError> {
            self.messages.lock().push(message);
            Ok(())
        }
    }

    /// Multi-producer end-to-end test: producers -> RingBuffer -> RawDataReporter
    ///
    /// 验证：
    /// 1. 每个写入的值恰好送达一次
    /// 2. stop 之后缓冲区为空
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_concurrent_producers_deliver_exactly_once() {
        const PRODUCERS: i64 = 4;
        const PER_PRODUCER: i64 = 2_500;

        let buffer = Arc::new(RingBuffer::with_capacity(1024));
        let sender = CollectingSender::default();
        let mut reporter = RawDataReporter::new(
            "ProcessingTime",
            sender.clone(),
            Arc::clone(&buffer),
            Arc::new(LongValueWriter),
            ReporterConfig {
                flush_size: 256,
                max_flush_size: 512,
                max_spinning_time: Duration::from_millis(50),
                max_parallel_consumers: 3,
            },
        );
        reporter.start().unwrap();

        let mut producers = Vec::new();
        for p in 0..PRODUCERS {
            let buffer = Arc::clone(&buffer);
            producers.push(tokio::task::spawn_blocking(move || {
                for i in 0..PER_PRODUCER {
                    let value = p * 1_000_000 + i;
                    // Full buffer: wait for the reporter to drain
                    while !buffer.try_write(value, 0) {
                        std::thread::yield_now();
                    }
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }

        reporter.stop().await;

        let values: Vec<i64> = sender
            .payloads
            .lock()
            .iter()
            .flat_map(|p| decode_long_values(p).unwrap())
            .map(|v| v.value)
            .collect();
        let distinct: HashSet<i64> = values.iter().copied().collect();

        assert_eq!(values.len(), (PRODUCERS * PER_PRODUCER) as usize);
        assert_eq!(distinct.len(), values.len());
        assert_eq!(buffer.roughly_estimate_items_to_consume(), 0);
        assert_eq!(
            reporter.metrics().entries_flushed(),
            (PRODUCERS * PER_PRODUCER) as u64
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_parallel_sends_are_bounded() {
        let buffer = Arc::new(RingBuffer::with_capacity(256));
        let sender = SlowSender::default();
        let mut reporter = RawDataReporter::new(
            "Retries",
            sender.clone(),
            Arc::clone(&buffer),
            Arc::new(LongValueWriter),
            ReporterConfig {
                flush_size: 1,
                max_flush_size: 5,
                max_spinning_time: Duration::from_millis(10),
                max_parallel_consumers: 3,
            },
        );
        reporter.start().unwrap();

        for i in 0..100 {
            assert!(buffer.try_write(i, 0));
        }
        reporter.stop().await;

        let delivered: usize = sender
            .payloads
            .lock()
            .iter()
            .map(|p| decode_long_values(p).unwrap().len())
            .sum();
        assert_eq!(delivered, 100);
        assert!(sender.max_seen.load(Ordering::SeqCst) <= 3);
        assert!(reporter.metrics().max_in_flight() <= 3);
        assert!(sender.payloads.lock().iter().all(|p| {
            decode_long_values(p).unwrap().len() <= 5
        }));
    }

    /// Probe -> MetricBuffer -> RawDataReporter -> MonitoringSender -> decode
    #[tokio::test]
    async fn test_e2e_probe_to_monitoring_message() {
        let mut config = ReportingConfig::new("Sales", "Particular.Monitoring");
        config.instance_id = Some("sales-1".to_string());
        let host = HostInformation::local();

        let registry = ProbeRegistry::new();
        let buffers = registry.attach_buffers_with_capacity(64);
        let queue_buffer = &buffers[3];

        let dispatcher = Arc::new(CapturingDispatcher::default());
        let sender = MonitoringSender::new(
            Arc::clone(&dispatcher),
            &config,
            &host,
            queue_buffer.metric_type(),
        );
        let mut reporter = RawDataReporter::for_buffer(
            queue_buffer,
            sender,
            ReporterConfig::from_settings(&config.reporter, config.reporting_interval()),
        );
        reporter.start().unwrap();

        registry.queue_length.signal("Sales.Input", 12);
        registry.queue_length.signal("Billing.Input", 3);
        registry.queue_length.signal("Sales.Input", 15);
        registry.retries.signal("Sales.OrderPlaced");

        reporter.stop().await;

        let messages = dispatcher.messages.lock();
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message.destination, "Particular.Monitoring");
        assert_eq!(message.headers[headers::METRIC_TYPE], "QueueLength");
        assert_eq!(message.headers[headers::METRIC_INSTANCE_ID], "sales-1");
        assert_eq!(message.headers[headers::ORIGINATING_HOST_ID], host.host_id_string());
        assert_eq!(message.time_to_be_received, config.time_to_be_received());

        let pool = MessagePool::new();
        let decoded = decode_tagged(&message.body, &pool).unwrap();
        let mut per_tag: Vec<(String, Vec<i64>)> = decoded
            .iter()
            .map(|m| {
                (
                    m.tag_value().to_string(),
                    m.entries().iter().map(|v| v.value).collect(),
                )
            })
            .collect();
        per_tag.sort();
        assert_eq!(
            per_tag,
            vec![
                ("Billing.Input".to_string(), vec![3]),
                ("Sales.Input".to_string(), vec![12, 15]),
            ]
        );
        pool.release_all(decoded);
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;
    use std::time::Duration;

    use config_loader::ConfigLoader;
    use contracts::HostInformation;
    use probes::ProbeRegistry;
    use reporter::ReportingSession;
    use tokio::net::UdpSocket;
    use wire::{decode_tagged, MessagePool};

    /// Config file -> ReportingSession -> UDP datagrams
    #[tokio::test]
    async fn test_config_file_drives_udp_session() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap();

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
endpoint_name = "Shipping"
metrics_address = "Particular.Monitoring"
reporting_interval_ms = 50

[reporter]
flush_size = 1000
max_flush_size = 100
max_parallel_consumers = 2

[sender]
kind = "udp"
addr = "{addr}"
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        let registry = ProbeRegistry::new();
        let buffers = registry.attach_buffers_with_capacity(256);
        let mut session =
            ReportingSession::from_config(&config, &HostInformation::local(), &buffers)
                .await
                .unwrap();
        session.start().unwrap();

        registry
            .critical_time
            .record(Duration::from_millis(250), "Shipping.OrderShipped");

        // Partial flush after the reporting interval
        let mut buf = vec![0u8; 65_536];
        let len = tokio::time::timeout(Duration::from_secs(5), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();

        session.stop().await;

        let pool = MessagePool::new();
        let decoded = decode_tagged(&buf[..len], &pool).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].tag_value(), "Shipping.OrderShipped");
        assert_eq!(decoded[0].entries()[0].value, 250);

        let sent: u64 = session
            .metrics()
            .iter()
            .filter(|(name, _)| name == "CriticalTime")
            .map(|(_, m)| m.payloads_sent)
            .sum();
        assert_eq!(sent, 1);
    }
}
