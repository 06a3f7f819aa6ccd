//! MonitoringSender - wraps payloads into monitoring messages

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    headers, ContractError, HostInformation, MessageDispatcher, OutgoingMessage, PayloadSender,
    ReportingConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Sender turning each payload into an [`OutgoingMessage`] for the collector.
///
/// Every message gets a fresh id, the endpoint/host headers, the content type
/// and metric type headers, and the configured time-to-be-received.
pub struct MonitoringSender<D> {
    dispatcher: Arc<D>,
    destination: String,
    headers: BTreeMap<String, String>,
    time_to_be_received: Duration,
}

impl<D> MonitoringSender<D> {
    /// Create a sender for `metric_type`
    pub fn new(
        dispatcher: Arc<D>,
        config: &ReportingConfig,
        host: &HostInformation,
        metric_type: &str,
    ) -> Self {
        let mut headers = Self::base_headers(config, host);
        headers.insert(
            headers::CONTENT_TYPE.to_string(),
            headers::TAGGED_VALUE_CONTENT_TYPE.to_string(),
        );
        headers.insert(headers::METRIC_TYPE.to_string(), metric_type.to_string());

        Self {
            dispatcher,
            destination: config.metrics_address.clone(),
            headers,
            time_to_be_received: config.time_to_be_received(),
        }
    }

    /// Headers identifying the reporting endpoint and host
    pub fn base_headers(
        config: &ReportingConfig,
        host: &HostInformation,
    ) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert(
            headers::ORIGINATING_ENDPOINT.to_string(),
            config.endpoint_name.clone(),
        );
        headers.insert(
            headers::ORIGINATING_MACHINE.to_string(),
            host.machine_name.clone(),
        );
        headers.insert(
            headers::ORIGINATING_HOST_ID.to_string(),
            host.host_id_string(),
        );
        headers.insert(
            headers::HOST_DISPLAY_NAME.to_string(),
            host.display_name.clone(),
        );
        if let Some(instance_id) = config.instance_id() {
            headers.insert(
                headers::METRIC_INSTANCE_ID.to_string(),
                instance_id.to_string(),
            );
        }
        headers
    }

    /// Headers attached to every message
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Collector address
    pub fn destination(&self) -> &str {
        &self.destination
    }
}

impl<D: MessageDispatcher + Sync> PayloadSender for MonitoringSender<D> {
    fn name(&self) -> &str {
        &self.destination
    }

    #[instrument(
        name = "monitoring_sender_send",
        skip(self, payload, cancel),
        fields(destination = %self.destination, bytes = payload.len())
    )]
    async fn send(&self, payload: Bytes, cancel: CancellationToken) -> Result<(), ContractError> {
        let message = OutgoingMessage {
            id: Uuid::new_v4().to_string(),
            headers: self.headers.clone(),
            body: payload,
            destination: self.destination.clone(),
            time_to_be_received: self.time_to_be_received,
        };
        let message_id = message.id.clone();

        match self.dispatcher.dispatch(message, cancel).await {
            Ok(()) => {
                debug!(message_id = %message_id, "Metrics message handed to dispatcher");
                Ok(())
            }
            Err(e) => {
                debug!(message_id = %message_id, error = %e, "Metrics message not dispatched");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Mock dispatcher capturing messages
    #[derive(Default)]
    struct CapturingDispatcher {
        messages: Mutex<Vec<OutgoingMessage>>,
        fail: bool,
    }

    impl MessageDispatcher for CapturingDispatcher {
        async fn dispatch(
            &self,
            message: OutgoingMessage,
            cancel: CancellationToken,
        ) -> Result<(), ContractError> {
            if self.fail {
                return Err(ContractError::dispatch(&message.destination, "queue not found"));
            }
            if cancel.is_cancelled() {
                return Err(ContractError::Cancelled);
            }
            self.messages.lock().push(message);
            Ok(())
        }
    }

    fn host() -> HostInformation {
        HostInformation::new(Uuid::nil(), "display", "machine")
    }

    #[tokio::test]
    async fn test_envelope_headers_and_ttbr() {
        let mut config = ReportingConfig::new("Sales", "Particular.Monitoring");
        config.instance_id = Some("sales-1".to_string());
        config.time_to_be_received_ms = 60_000;

        let dispatcher = Arc::new(CapturingDispatcher::default());
        let sender = MonitoringSender::new(Arc::clone(&dispatcher), &config, &host(), "ProcessingTime");

        sender
            .send(Bytes::from_static(b"first"), CancellationToken::new())
            .await
            .unwrap();
        sender
            .send(Bytes::from_static(b"second"), CancellationToken::new())
            .await
            .unwrap();

        let messages = dispatcher.messages.lock();
        assert_eq!(messages.len(), 2);
        assert_ne!(messages[0].id, messages[1].id);

        let message = &messages[0];
        assert_eq!(message.destination, "Particular.Monitoring");
        assert_eq!(message.body, Bytes::from_static(b"first"));
        assert_eq!(message.time_to_be_received, Duration::from_secs(60));

        let h = &message.headers;
        assert_eq!(h[headers::ORIGINATING_ENDPOINT], "Sales");
        assert_eq!(h[headers::ORIGINATING_MACHINE], "machine");
        assert_eq!(h[headers::ORIGINATING_HOST_ID], "00000000000000000000000000000000");
        assert_eq!(h[headers::HOST_DISPLAY_NAME], "display");
        assert_eq!(h[headers::METRIC_INSTANCE_ID], "sales-1");
        assert_eq!(h[headers::CONTENT_TYPE], "TaggedLongValueWriterOccurrence");
        assert_eq!(h[headers::METRIC_TYPE], "ProcessingTime");
    }

    #[test]
    fn test_instance_id_header_omitted_when_unset() {
        let config = ReportingConfig::new("Sales", "Particular.Monitoring");
        let headers = MonitoringSender::<CapturingDispatcher>::base_headers(&config, &host());
        assert!(!headers.contains_key(headers::METRIC_INSTANCE_ID));
        assert_eq!(headers.len(), 4);
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_returned() {
        let config = ReportingConfig::new("Sales", "Particular.Monitoring");
        let dispatcher = Arc::new(CapturingDispatcher {
            fail: true,
            ..Default::default()
        });
        let sender = MonitoringSender::new(dispatcher, &config, &host(), "Retries");

        let err = sender
            .send(Bytes::from_static(b"x"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Dispatch { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_failure_kept_after_shutdown() {
        let config = ReportingConfig::new("Sales", "Particular.Monitoring");
        let dispatcher = Arc::new(CapturingDispatcher {
            fail: true,
            ..Default::default()
        });
        let sender = MonitoringSender::new(dispatcher, &config, &host(), "Retries");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = sender.send(Bytes::from_static(b"x"), cancel).await.unwrap_err();
        assert!(!err.is_cancelled());
        assert!(matches!(err, ContractError::Dispatch { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_dispatch() {
        let config = ReportingConfig::new("Sales", "Particular.Monitoring");
        let sender = MonitoringSender::new(
            Arc::new(CapturingDispatcher::default()),
            &config,
            &host(),
            "Retries",
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = sender.send(Bytes::from_static(b"x"), cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
