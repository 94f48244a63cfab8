//! Broker provider implementations.

pub mod memory;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use memory::InMemoryBroker;

#[cfg(feature = "kafka")]
pub use kafka::KafkaConnector;
