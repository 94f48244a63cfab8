//! Kafka implementation using rdkafka.
//!
//! Partitions are assigned manually rather than through group rebalancing,
//! and offsets are never committed: every reader starts from the position it
//! is opened with.

use crate::client::{BrokerConnection, BrokerConnector, PartitionReader};
use crate::error::StreamError;
use crate::message::{LogRecord, PartitionIndex, StartOffset, StreamName};
use crate::provider::{KafkaConfig, ProviderType};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message as _;
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Kafka Connector
// ============================================================================

/// Connector that builds rdkafka consumers
pub struct KafkaConnector {
    config: KafkaConfig,
}

impl KafkaConnector {
    /// Create new Kafka connector
    pub fn new(config: KafkaConfig) -> Self {
        Self { config }
    }

    fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new();
        client
            .set("bootstrap.servers", &self.config.bootstrap_servers)
            .set("client.id", &self.config.client_id)
            .set("group.id", &self.config.group_id)
            .set(
                "session.timeout.ms",
                self.config.session_timeout_ms.to_string(),
            )
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false");
        client
    }

    fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.config.metadata_timeout_ms)
    }
}

#[async_trait]
impl BrokerConnector for KafkaConnector {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, StreamError> {
        let consumer: StreamConsumer =
            self.client_config()
                .create()
                .map_err(|e| StreamError::ConnectionFailed {
                    message: e.to_string(),
                })?;
        let consumer = Arc::new(consumer);

        // Creating the client does not contact the cluster; a metadata round
        // trip does.
        let metadata_client = Arc::clone(&consumer);
        let timeout = self.metadata_timeout();
        let brokers = tokio::task::spawn_blocking(move || {
            metadata_client
                .fetch_metadata(None, timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|e| StreamError::ProviderError {
            provider: ProviderType::Kafka.to_string(),
            message: e.to_string(),
        })?
        .map_err(|e| StreamError::ConnectionFailed {
            message: e.to_string(),
        })?;

        debug!(
            bootstrap_servers = %self.config.bootstrap_servers,
            brokers = brokers,
            "Kafka cluster reachable"
        );

        Ok(Box::new(KafkaConnection {
            consumer,
            metadata_timeout: timeout,
        }))
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Kafka
    }
}

// ============================================================================
// Kafka Connection
// ============================================================================

struct KafkaConnection {
    consumer: Arc<StreamConsumer>,
    metadata_timeout: Duration,
}

impl KafkaConnection {
    async fn partition_count(&self, stream: &StreamName) -> Result<usize, StreamError> {
        let consumer = Arc::clone(&self.consumer);
        let topic = stream.as_str().to_string();
        let timeout = self.metadata_timeout;

        tokio::task::spawn_blocking(move || {
            let metadata = consumer
                .fetch_metadata(Some(&topic), timeout)
                .map_err(|e| StreamError::ConnectionFailed {
                    message: e.to_string(),
                })?;

            match metadata.topics().iter().find(|t| t.name() == topic) {
                Some(t) if t.error().is_none() => Ok(t.partitions().len()),
                _ => Err(StreamError::StreamNotFound { stream: topic }),
            }
        })
        .await
        .map_err(|e| StreamError::ProviderError {
            provider: ProviderType::Kafka.to_string(),
            message: e.to_string(),
        })?
    }
}

#[async_trait]
impl BrokerConnection for KafkaConnection {
    async fn open_partition(
        &self,
        stream: &StreamName,
        partition: PartitionIndex,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionReader>, StreamError> {
        let partitions = self.partition_count(stream).await?;
        if partition.as_i32() as usize >= partitions {
            return Err(StreamError::PartitionNotFound {
                stream: stream.to_string(),
                partition: partition.as_i32(),
            });
        }

        let offset = match start {
            StartOffset::Newest => Offset::End,
            StartOffset::Earliest => Offset::Beginning,
            StartOffset::At(o) => Offset::Offset(o),
        };

        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(stream.as_str(), partition.as_i32(), offset)
            .map_err(|e| StreamError::ReaderOpenFailed {
                stream: stream.to_string(),
                partition: partition.as_i32(),
                message: e.to_string(),
            })?;

        self.consumer
            .assign(&assignment)
            .map_err(|e| StreamError::ReaderOpenFailed {
                stream: stream.to_string(),
                partition: partition.as_i32(),
                message: e.to_string(),
            })?;

        Ok(Box::new(KafkaPartitionReader {
            consumer: Arc::clone(&self.consumer),
            stream: stream.clone(),
            partition,
        }))
    }

    fn close(&self) {
        if let Err(e) = self.consumer.unassign() {
            warn!(error = %e, "Failed to unassign Kafka partitions on close");
        }
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Kafka
    }
}

// ============================================================================
// Kafka Partition Reader
// ============================================================================

struct KafkaPartitionReader {
    consumer: Arc<StreamConsumer>,
    stream: StreamName,
    partition: PartitionIndex,
}

#[async_trait]
impl PartitionReader for KafkaPartitionReader {
    async fn next_record(&mut self) -> Option<Result<LogRecord, StreamError>> {
        let record = match self.consumer.recv().await {
            Ok(message) => {
                let timestamp = message
                    .timestamp()
                    .to_millis()
                    .and_then(DateTime::<Utc>::from_timestamp_millis);
                let record = LogRecord::new(
                    message.key().map(Bytes::copy_from_slice),
                    message
                        .payload()
                        .map(Bytes::copy_from_slice)
                        .unwrap_or_default(),
                    self.partition,
                    message.offset(),
                );
                Ok(match timestamp {
                    Some(ts) => record.with_timestamp(ts),
                    None => record,
                })
            }
            Err(e) => Err(StreamError::ProviderError {
                provider: ProviderType::Kafka.to_string(),
                message: e.to_string(),
            }),
        };

        Some(record)
    }

    fn stream(&self) -> &StreamName {
        &self.stream
    }

    fn partition(&self) -> PartitionIndex {
        self.partition
    }
}
