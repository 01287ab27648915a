// Error types for ingestion and aggregation

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, PulseError>;

/// Errors that can occur while ingesting events or building datasets
#[derive(Debug, Error)]
pub enum PulseError {
    /// Webhook body could not be decoded
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// No classification rule exists for the event type
    #[error("Unrecognized event kind: {0}")]
    UnrecognizedEventKind(String),

    /// Actor registry lookup failed
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Activity log insert or query failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PulseError {
    /// Create a malformed payload error
    pub fn malformed(msg: impl Into<String>) -> Self {
        PulseError::MalformedPayload(msg.into())
    }

    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        PulseError::RegistryUnavailable(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        PulseError::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        PulseError::Configuration(msg.into())
    }

    /// Whether the error means the event was intentionally skipped rather than lost
    pub fn is_ignored_event(&self) -> bool {
        matches!(self, PulseError::UnrecognizedEventKind(_))
    }
}
