//! Client traits for broker connections and partition readers.

use crate::error::StreamError;
use crate::message::{LogRecord, PartitionIndex, StartOffset, StreamName};
use crate::provider::{ProviderConfig, ProviderType};
use crate::providers::InMemoryBroker;
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Interface implemented by specific brokers to establish connections
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Attempt a single connection to the broker
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, StreamError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

/// An established broker connection
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Open a sequential reader over one partition of a stream
    async fn open_partition(
        &self,
        stream: &StreamName,
        partition: PartitionIndex,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionReader>, StreamError>;

    /// Close the underlying connection
    ///
    /// Called at most once, by [`crate::connection::Connection`].
    fn close(&self);

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

/// Sequential, non-restartable reader over a single partition
#[async_trait]
pub trait PartitionReader: Send {
    /// Wait for the next record
    ///
    /// Returns `None` once the reader can produce no more records, for
    /// example after its connection has been released. A record-level
    /// `Err` does not end the sequence.
    async fn next_record(&mut self) -> Option<Result<LogRecord, StreamError>>;

    /// Stream this reader consumes
    fn stream(&self) -> &StreamName;

    /// Partition this reader consumes
    fn partition(&self) -> PartitionIndex;
}

/// Factory for creating broker connectors from configuration
pub struct BrokerConnectorFactory;

impl BrokerConnectorFactory {
    /// Create connector from provider configuration
    pub fn create(config: &ProviderConfig) -> Result<Arc<dyn BrokerConnector>, StreamError> {
        match config {
            ProviderConfig::InMemory(in_memory_config) => {
                Ok(Arc::new(InMemoryBroker::new(in_memory_config.clone())))
            }
            #[cfg(feature = "kafka")]
            ProviderConfig::Kafka(kafka_config) => Ok(Arc::new(
                crate::providers::KafkaConnector::new(kafka_config.clone()),
            )),
            #[cfg(not(feature = "kafka"))]
            ProviderConfig::Kafka(_) => Err(StreamError::ConfigurationError(
                crate::error::ConfigurationError::UnsupportedProvider {
                    provider: ProviderType::Kafka.to_string(),
                    message: "built without the 'kafka' feature".to_string(),
                },
            )),
        }
    }
}
