//! PayloadSender trait - Reporter output interface
//!
//! The reporter hands every encoded payload to a sender; how the bytes leave
//! the process is the sender's business.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::ContractError;

/// Payload output trait
///
/// All sender implementations must implement this trait.
#[trait_variant::make(PayloadSender: Send)]
pub trait LocalPayloadSender {
    /// Sender name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Send one encoded payload
    ///
    /// `cancel` is triggered when the owning reporter is disposed; a sender
    /// aborting because of it should return [`ContractError::Cancelled`].
    ///
    /// # Errors
    /// Returns send error (should include context)
    async fn send(&self, payload: Bytes, cancel: CancellationToken) -> Result<(), ContractError>;
}
