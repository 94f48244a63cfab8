//! Record types for log operations including stream and partition identifiers.

use crate::error::ValidationError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated stream (topic) name
///
/// Follows the broker topic naming rules: 1-249 characters drawn from ASCII
/// alphanumerics, `.`, `_` and `-`, and never exactly `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamName(String);

impl StreamName {
    /// Create new stream name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() || name.len() > 249 {
            return Err(ValidationError::OutOfRange {
                field: "stream_name".to_string(),
                message: "must be 1-249 characters".to_string(),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidFormat {
                field: "stream_name".to_string(),
                message: "only ASCII alphanumeric, '.', '_' and '-' allowed".to_string(),
            });
        }

        if name == "." || name == ".." {
            return Err(ValidationError::InvalidFormat {
                field: "stream_name".to_string(),
                message: "'.' and '..' are reserved".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get stream name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StreamName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Zero-based partition index within a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionIndex(i32);

impl PartitionIndex {
    /// Create new partition index, rejecting negative values
    pub fn new(index: i32) -> Result<Self, ValidationError> {
        if index < 0 {
            return Err(ValidationError::OutOfRange {
                field: "partition".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        Ok(Self(index))
    }

    /// Get numeric value
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for PartitionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position a partition reader starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartOffset {
    /// Only records appended after the reader was opened
    Newest,
    /// Everything still retained by the broker
    Earliest,
    /// An explicit offset
    At(i64),
}

impl Default for StartOffset {
    fn default() -> Self {
        Self::Newest
    }
}

// ============================================================================
// Log Records
// ============================================================================

/// A raw record read from a partition
///
/// The reader hands records over undecoded; interpreting `key` and `value`
/// is the consumer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Routing key, if the producer set one
    pub key: Option<Bytes>,
    /// Record payload
    pub value: Bytes,
    /// Partition the record was read from
    pub partition: PartitionIndex,
    /// Offset of the record within its partition
    pub offset: i64,
    /// Broker-assigned timestamp, when available
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogRecord {
    /// Create a record with the given key and payload
    pub fn new(key: Option<Bytes>, value: Bytes, partition: PartitionIndex, offset: i64) -> Self {
        Self {
            key,
            value,
            partition,
            offset,
            timestamp: None,
        }
    }

    /// Attach a broker timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Routing key as UTF-8, if present and valid
    pub fn key_str(&self) -> Option<&str> {
        self.key
            .as_ref()
            .and_then(|key| std::str::from_utf8(key).ok())
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
