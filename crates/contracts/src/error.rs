//! Layered error definitions
//!
//! Categorized by source: config / sender / dispatch

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sender Errors =====
    /// Payload send error
    #[error("sender '{sender}' error: {message}")]
    Send { sender: String, message: String },

    // ===== Dispatch Errors =====
    /// Message dispatch error
    #[error("dispatch to '{destination}' failed: {message}")]
    Dispatch {
        destination: String,
        message: String,
    },

    /// Operation cancelled by shutdown
    #[error("operation cancelled")]
    Cancelled,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create payload send error
    pub fn send(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Send {
            sender: sender.into(),
            message: message.into(),
        }
    }

    /// Create dispatch error
    pub fn dispatch(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dispatch {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Whether the error is the expected result of a shutdown
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
