//! Error types for log broker operations.

use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for all broker and reader operations
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Connection to broker failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Stream not found: {stream}")]
    StreamNotFound { stream: String },

    #[error("Partition {partition} not found in stream '{stream}'")]
    PartitionNotFound { stream: String, partition: i32 },

    #[error("Failed to open reader for '{stream}' partition {partition}: {message}")]
    ReaderOpenFailed {
        stream: String,
        partition: i32,
        message: String,
    },

    #[error("Connection has been released")]
    ConnectionClosed,

    #[error("Provider error ({provider}): {message}")]
    ProviderError { provider: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),
}

impl StreamError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } => true,
            Self::StreamNotFound { .. } => false,
            Self::PartitionNotFound { .. } => false,
            Self::ReaderOpenFailed { .. } => false,
            Self::ConnectionClosed => false,
            Self::ProviderError { .. } => true, // Broker-side hiccups usually clear up
            Self::ConfigurationError(_) => false,
            Self::ValidationError(_) => false,
        }
    }

    /// Get suggested retry delay
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ConnectionFailed { .. } => Some(Duration::from_secs(5)),
            Self::ProviderError { .. } => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Provider '{provider}' is not available: {message}")]
    UnsupportedProvider { provider: String, message: String },
}

/// Validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
