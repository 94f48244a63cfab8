//! Provider types and configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Enumeration of supported log brokers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    Kafka,
    InMemory,
}

impl ProviderType {
    /// Provider name used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kafka => "kafka",
            Self::InMemory => "in_memory",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for broker connection management
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub provider: ProviderConfig,
    /// Fixed delay between connection attempts
    pub connect_retry_delay: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::InMemory(InMemoryConfig::default()),
            connect_retry_delay: Duration::from_secs(5),
        }
    }
}

/// Provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProviderConfig {
    Kafka(KafkaConfig),
    InMemory(InMemoryConfig),
}

impl ProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Kafka(_) => ProviderType::Kafka,
            Self::InMemory(_) => ProviderType::InMemory,
        }
    }
}

/// Kafka connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Comma-separated broker addresses
    pub bootstrap_servers: String,
    pub client_id: String,
    /// Group id reported to the broker; partitions are assigned manually
    pub group_id: String,
    pub session_timeout_ms: u32,
    /// Timeout for the metadata request used to verify connectivity
    pub metadata_timeout_ms: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "kafka:29092".to_string(),
            client_id: "task-stats".to_string(),
            group_id: "task-stats".to_string(),
            session_timeout_ms: 6000,
            metadata_timeout_ms: 5000,
        }
    }
}

/// In-memory broker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Partitions created for every stream
    pub partitions_per_stream: u32,
    /// Streams that exist from the start
    pub streams: Vec<String>,
    /// Number of initial connection attempts to refuse
    pub refuse_first_connections: u32,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            partitions_per_stream: 1,
            streams: vec!["Stat".to_string()],
            refuse_first_connections: 0,
        }
    }
}
