//! In-memory broker implementation for testing and development.
//!
//! This module provides a process-local partitioned log that:
//! - Keeps every published record, per stream and partition, in append order
//! - Lets readers start at the newest offset, the earliest, or an explicit one
//! - Wakes waiting readers when records are appended
//! - Can refuse a configurable number of initial connection attempts
//!
//! This provider is intended for:
//! - Unit and integration testing of log consumers
//! - Local development without a Kafka cluster

use crate::client::{BrokerConnection, BrokerConnector, PartitionReader};
use crate::error::StreamError;
use crate::message::{LogRecord, PartitionIndex, StartOffset, StreamName};
use crate::provider::{InMemoryConfig, ProviderType};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::warn;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Thread-safe storage for all streams
struct LogStorage {
    streams: HashMap<StreamName, Vec<Vec<LogRecord>>>,
    connect_attempts: u32,
    config: InMemoryConfig,
}

impl LogStorage {
    fn new(config: InMemoryConfig) -> Self {
        let mut streams = HashMap::new();
        for name in &config.streams {
            match StreamName::new(name.as_str()) {
                Ok(stream) => {
                    streams.insert(stream, empty_partitions(config.partitions_per_stream));
                }
                Err(e) => warn!(stream = %name, error = %e, "Skipping invalid stream name"),
            }
        }

        Self {
            streams,
            connect_attempts: 0,
            config,
        }
    }

    fn partition(
        &self,
        stream: &StreamName,
        partition: PartitionIndex,
    ) -> Result<&Vec<LogRecord>, StreamError> {
        let partitions = self
            .streams
            .get(stream)
            .ok_or_else(|| StreamError::StreamNotFound {
                stream: stream.to_string(),
            })?;

        partitions
            .get(partition.as_i32() as usize)
            .ok_or_else(|| StreamError::PartitionNotFound {
                stream: stream.to_string(),
                partition: partition.as_i32(),
            })
    }
}

fn empty_partitions(count: u32) -> Vec<Vec<LogRecord>> {
    (0..count.max(1)).map(|_| Vec::new()).collect()
}

// ============================================================================
// InMemoryBroker
// ============================================================================

/// In-memory partitioned log
///
/// Cloning yields another handle to the same log, so a test can keep one
/// handle for publishing while a connection manager owns another.
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use stream_runtime::{ConnectionManager, InMemoryBroker, PartitionIndex, StartOffset, StreamName};
///
/// # tokio_test::block_on(async {
/// let broker = InMemoryBroker::default();
/// let stream = StreamName::new("Stat").unwrap();
/// let partition = PartitionIndex::new(0).unwrap();
///
/// let manager = ConnectionManager::new(Arc::new(broker.clone()), Duration::from_millis(10));
/// let connection = manager.connect().await;
/// let mut reader = connection
///     .open_partition(&stream, partition, StartOffset::Newest)
///     .await
///     .unwrap();
///
/// broker.publish(&stream, partition, Some("Like"), "payload").unwrap();
/// let record = reader.next_record().await.unwrap().unwrap();
/// assert_eq!(record.key_str(), Some("Like"));
///
/// connection.release();
/// assert!(reader.next_record().await.is_none());
/// # });
/// ```
#[derive(Clone)]
pub struct InMemoryBroker {
    storage: Arc<RwLock<LogStorage>>,
    appended: watch::Sender<u64>,
}

impl InMemoryBroker {
    /// Create new in-memory broker with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            storage: Arc::new(RwLock::new(LogStorage::new(config))),
            appended,
        }
    }

    /// Create a stream if it does not exist yet
    pub fn create_stream(&self, stream: &StreamName) {
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());
        let partitions = storage.config.partitions_per_stream;
        storage
            .streams
            .entry(stream.clone())
            .or_insert_with(|| empty_partitions(partitions));
    }

    /// Append a record and return its offset
    pub fn publish(
        &self,
        stream: &StreamName,
        partition: PartitionIndex,
        key: Option<&str>,
        value: impl Into<Bytes>,
    ) -> Result<i64, StreamError> {
        let offset = {
            let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());
            let log = storage
                .streams
                .get_mut(stream)
                .ok_or_else(|| StreamError::StreamNotFound {
                    stream: stream.to_string(),
                })?
                .get_mut(partition.as_i32() as usize)
                .ok_or_else(|| StreamError::PartitionNotFound {
                    stream: stream.to_string(),
                    partition: partition.as_i32(),
                })?;

            let offset = log.len() as i64;
            let record = LogRecord::new(
                key.map(|k| Bytes::copy_from_slice(k.as_bytes())),
                value.into(),
                partition,
                offset,
            )
            .with_timestamp(Utc::now());
            log.push(record);
            offset
        };

        self.appended.send_modify(|version| *version += 1);
        Ok(offset)
    }

    /// Number of records currently held by a partition
    pub fn len(
        &self,
        stream: &StreamName,
        partition: PartitionIndex,
    ) -> Result<usize, StreamError> {
        let storage = self.storage.read().unwrap_or_else(|e| e.into_inner());
        storage.partition(stream, partition).map(Vec::len)
    }

    /// Number of connection attempts seen so far
    pub fn connect_attempts(&self) -> u32 {
        self.storage
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .connect_attempts
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    async fn connect(&self) -> Result<Box<dyn BrokerConnection>, StreamError> {
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());
        storage.connect_attempts += 1;

        if storage.connect_attempts <= storage.config.refuse_first_connections {
            return Err(StreamError::ConnectionFailed {
                message: format!(
                    "in-memory broker refused attempt {}",
                    storage.connect_attempts
                ),
            });
        }

        Ok(Box::new(InMemoryConnection {
            broker: self.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}

// ============================================================================
// InMemoryConnection
// ============================================================================

/// Connection handle onto an [`InMemoryBroker`]
struct InMemoryConnection {
    broker: InMemoryBroker,
    closed: AtomicBool,
}

#[async_trait]
impl BrokerConnection for InMemoryConnection {
    async fn open_partition(
        &self,
        stream: &StreamName,
        partition: PartitionIndex,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionReader>, StreamError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StreamError::ConnectionClosed);
        }

        let position = {
            let storage = self
                .broker
                .storage
                .read()
                .unwrap_or_else(|e| e.into_inner());
            let log = storage.partition(stream, partition)?;

            match start {
                StartOffset::Newest => log.len(),
                StartOffset::Earliest => 0,
                StartOffset::At(offset) => offset.max(0) as usize,
            }
        };

        Ok(Box::new(InMemoryPartitionReader {
            storage: Arc::clone(&self.broker.storage),
            appended: self.broker.appended.subscribe(),
            stream: stream.clone(),
            partition,
            position,
        }))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}

// ============================================================================
// InMemoryPartitionReader
// ============================================================================

/// Cursor over one in-memory partition
struct InMemoryPartitionReader {
    storage: Arc<RwLock<LogStorage>>,
    appended: watch::Receiver<u64>,
    stream: StreamName,
    partition: PartitionIndex,
    position: usize,
}

impl InMemoryPartitionReader {
    fn record_at_cursor(&self) -> Result<Option<LogRecord>, StreamError> {
        let storage = self.storage.read().unwrap_or_else(|e| e.into_inner());
        let log = storage.partition(&self.stream, self.partition)?;
        Ok(log.get(self.position).cloned())
    }
}

#[async_trait]
impl PartitionReader for InMemoryPartitionReader {
    async fn next_record(&mut self) -> Option<Result<LogRecord, StreamError>> {
        loop {
            // Mark the current version seen before looking, so an append that
            // lands after the check still wakes the wait below.
            self.appended.borrow_and_update();

            match self.record_at_cursor() {
                Ok(Some(record)) => {
                    self.position += 1;
                    return Some(Ok(record));
                }
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }

            if self.appended.changed().await.is_err() {
                return None;
            }
        }
    }

    fn stream(&self) -> &StreamName {
        &self.stream
    }

    fn partition(&self) -> PartitionIndex {
        self.partition
    }
}
