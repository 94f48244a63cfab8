//! Tests for broker error classification.

use super::*;

#[test]
fn test_connection_failures_are_transient() {
    let error = StreamError::ConnectionFailed {
        message: "broker unreachable".to_string(),
    };

    assert!(error.is_transient());
    assert_eq!(error.retry_after(), Some(Duration::from_secs(5)));
}

#[test]
fn test_reader_open_failures_are_permanent() {
    let error = StreamError::ReaderOpenFailed {
        stream: "Stat".to_string(),
        partition: 0,
        message: "unknown topic".to_string(),
    };

    assert!(!error.is_transient());
    assert!(error.retry_after().is_none());
}

#[test]
fn test_missing_partition_is_permanent() {
    let error = StreamError::PartitionNotFound {
        stream: "Stat".to_string(),
        partition: 7,
    };

    assert!(!error.is_transient());
    assert_eq!(
        error.to_string(),
        "Partition 7 not found in stream 'Stat'"
    );
}

#[test]
fn test_validation_error_converts() {
    let error: StreamError = ValidationError::InvalidFormat {
        field: "stream_name".to_string(),
        message: "contains whitespace".to_string(),
    }
    .into();

    assert!(matches!(error, StreamError::ValidationError(_)));
    assert!(!error.is_transient());
}
