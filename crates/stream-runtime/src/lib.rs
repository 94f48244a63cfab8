//! # Stream Runtime
//!
//! Partitioned log runtime used to consume Task-Stats events, with support
//! for Kafka and an in-memory log.
//!
//! This library provides:
//! - Provider-agnostic broker connections and partition readers
//! - Connection establishment with indefinite fixed-delay retry
//! - Release semantics that end every reader opened from a connection
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all broker operations
//! - [`message`] - Stream names, partitions, offsets and raw records
//! - [`provider`] - Provider types and configuration
//! - [`client`] - Connector, connection and reader traits
//! - [`connection`] - Retrying connection manager and releasable connections
//! - [`providers`] - Kafka and in-memory implementations

pub mod client;
pub mod connection;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;

pub use client::{BrokerConnection, BrokerConnector, BrokerConnectorFactory, PartitionReader};
pub use connection::{Connection, ConnectionManager};
pub use error::{ConfigurationError, StreamError, ValidationError};
pub use message::{LogRecord, PartitionIndex, StartOffset, StreamName};
pub use provider::{BrokerConfig, InMemoryConfig, KafkaConfig, ProviderConfig, ProviderType};
pub use providers::InMemoryBroker;

#[cfg(feature = "kafka")]
pub use providers::KafkaConnector;
