//! LogDispatcher - logs outgoing messages via tracing

use contracts::{ContractError, MessageDispatcher, OutgoingMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Dispatcher that logs message summaries instead of sending them
pub struct LogDispatcher {
    name: String,
}

impl LogDispatcher {
    /// Create a new LogDispatcher with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_message_summary(&self, message: &OutgoingMessage) {
        let metric_type = message
            .headers
            .get(contracts::headers::METRIC_TYPE)
            .map(String::as_str)
            .unwrap_or_default();

        info!(
            dispatcher = %self.name,
            message_id = %message.id,
            destination = %message.destination,
            metric_type,
            bytes = message.body.len(),
            ttbr_secs = message.time_to_be_received.as_secs(),
            "Metrics message dispatched"
        );
        debug!(dispatcher = %self.name, headers = ?message.headers, "Message headers");
    }
}

impl MessageDispatcher for LogDispatcher {
    #[instrument(
        name = "log_dispatcher_dispatch",
        skip(self, message, _cancel),
        fields(dispatcher = %self.name, message_id = %message.id)
    )]
    async fn dispatch(
        &self,
        message: OutgoingMessage,
        _cancel: CancellationToken,
    ) -> Result<(), ContractError> {
        self.log_message_summary(&message);
        Ok(())
    }
}
