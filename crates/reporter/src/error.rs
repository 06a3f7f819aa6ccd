//! Reporter error types

use thiserror::Error;

/// Reporter-specific errors
#[derive(Debug, Error)]
pub enum ReporterError {
    /// Sender creation error
    #[error("failed to create sender '{name}': {message}")]
    SenderCreation { name: String, message: String },

    /// Reporter started twice or outside a runtime
    #[error("reporter '{metric_type}' cannot start: {message}")]
    Start {
        metric_type: String,
        message: String,
    },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReporterError {
    /// Create a sender creation error
    pub fn sender_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SenderCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
