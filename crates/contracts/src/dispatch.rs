//! MessageDispatcher trait - transport seam used by the monitoring sender

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::ContractError;

/// A message ready for the transport
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Unique message id
    pub id: String,
    /// Message headers
    pub headers: BTreeMap<String, String>,
    /// Message body
    pub body: Bytes,
    /// Destination address (queue name or collector address)
    pub destination: String,
    /// Discard the message if not received within this time
    pub time_to_be_received: Duration,
}

/// Transport dispatch trait
#[trait_variant::make(MessageDispatcher: Send)]
pub trait LocalMessageDispatcher {
    /// Dispatch one message
    ///
    /// # Errors
    /// Returns dispatch error, or [`ContractError::Cancelled`] on shutdown
    async fn dispatch(
        &self,
        message: OutgoingMessage,
        cancel: CancellationToken,
    ) -> Result<(), ContractError>;
}
