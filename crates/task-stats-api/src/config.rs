//! Configuration types for the Task-Stats service
//!
//! Every field has a serde default, so a partial file (or none at all)
//! produces a usable configuration. [`ServiceConfig::validate`] rejects
//! values that parse but cannot work.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stream_runtime::{
    BrokerConfig, InMemoryConfig, KafkaConfig, PartitionIndex, ProviderConfig, StreamName,
};
use task_stats_core::query::QueryLimits;
use task_stats_core::retry::RetryPolicy;
use task_stats_core::store::PostgresStoreConfig;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Log broker settings
    pub broker: BrokerSettings,

    /// Fact store settings
    pub store: StoreSettings,

    /// Ingestion worker settings
    pub ingestion: IngestionConfig,

    /// Ranking query settings
    pub queries: QueriesConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be non-zero"));
        }

        self.broker.stream_name()?;
        self.broker.partition_index()?;

        if self.broker.provider == BrokerProvider::Kafka
            && self.broker.bootstrap_servers.trim().is_empty()
        {
            return Err(ConfigError::Missing {
                key: "broker.bootstrap_servers".to_string(),
            });
        }

        if self.store.backend == StoreBackend::Postgres && self.store.url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "store.url".to_string(),
            });
        }

        if self.store.max_connections == 0 {
            return Err(invalid("store.max_connections must be at least 1"));
        }

        if self.queries.top_tasks_limit == 0 || self.queries.top_users_limit == 0 {
            return Err(invalid("query limits must be at least 1"));
        }

        let retry = &self.ingestion.retry;
        if !(retry.backoff_multiplier.is_finite() && retry.backoff_multiplier >= 1.0) {
            return Err(invalid(
                "ingestion.retry.backoff_multiplier must be a finite number >= 1.0",
            ));
        }

        if retry.max_delay_ms < retry.initial_delay_ms {
            return Err(invalid(
                "ingestion.retry.max_delay_ms must not be below initial_delay_ms",
            ));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid {
        message: message.to_string(),
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Time allowed for in-flight requests and the worker after shutdown
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
            shutdown_timeout_seconds: 30,
        }
    }
}

/// Broker backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerProvider {
    Kafka,
    InMemory,
}

/// Log broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub provider: BrokerProvider,

    /// Comma-separated Kafka bootstrap servers
    pub bootstrap_servers: String,

    /// Stream carrying like and view events
    pub stream: String,

    pub partition: i32,

    /// Fixed delay between connection attempts
    pub connect_retry_delay_seconds: u64,

    pub client_id: String,

    pub group_id: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            provider: BrokerProvider::Kafka,
            bootstrap_servers: "kafka:29092".to_string(),
            stream: "Stat".to_string(),
            partition: 0,
            connect_retry_delay_seconds: 5,
            client_id: "task-stats".to_string(),
            group_id: "task-stats".to_string(),
        }
    }
}

impl BrokerSettings {
    pub fn stream_name(&self) -> Result<StreamName, ConfigError> {
        StreamName::new(self.stream.as_str()).map_err(|e| ConfigError::Invalid {
            message: format!("broker.stream: {}", e),
        })
    }

    pub fn partition_index(&self) -> Result<PartitionIndex, ConfigError> {
        PartitionIndex::new(self.partition).map_err(|e| ConfigError::Invalid {
            message: format!("broker.partition: {}", e),
        })
    }

    /// Connection settings for `stream-runtime`
    pub fn broker_config(&self) -> BrokerConfig {
        let provider = match self.provider {
            BrokerProvider::Kafka => ProviderConfig::Kafka(KafkaConfig {
                bootstrap_servers: self.bootstrap_servers.clone(),
                client_id: self.client_id.clone(),
                group_id: self.group_id.clone(),
                ..KafkaConfig::default()
            }),
            BrokerProvider::InMemory => ProviderConfig::InMemory(InMemoryConfig {
                streams: vec![self.stream.clone()],
                partitions_per_stream: (self.partition.max(0) as u32) + 1,
                ..InMemoryConfig::default()
            }),
        };

        BrokerConfig {
            provider,
            connect_retry_delay: Duration::from_secs(self.connect_retry_delay_seconds),
        }
    }
}

/// Fact store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Postgres,
    InMemory,
}

/// Fact store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,

    /// PostgreSQL connection URL
    pub url: String,

    pub max_connections: u32,

    pub acquire_timeout_seconds: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let postgres = PostgresStoreConfig::default();
        Self {
            backend: StoreBackend::Postgres,
            url: postgres.url,
            max_connections: postgres.max_connections,
            acquire_timeout_seconds: postgres.acquire_timeout.as_secs(),
        }
    }
}

impl StoreSettings {
    pub fn postgres_config(&self) -> PostgresStoreConfig {
        PostgresStoreConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_seconds),
        }
    }
}

/// Ingestion worker configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IngestionConfig {
    pub retry: RetrySettings,
}

/// Retry of transient store failures during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub enabled: bool,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            enabled: self.enabled,
            ..RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.initial_delay_ms),
                Duration::from_millis(self.max_delay_ms),
                self.backoff_multiplier,
            )
        }
    }
}

/// Ranking query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueriesConfig {
    pub top_tasks_limit: usize,
    pub top_users_limit: usize,
}

impl Default for QueriesConfig {
    fn default() -> Self {
        let limits = QueryLimits::default();
        Self {
            top_tasks_limit: limits.top_tasks,
            top_users_limit: limits.top_users,
        }
    }
}

impl QueriesConfig {
    pub fn limits(&self) -> QueryLimits {
        QueryLimits {
            top_tasks: self.top_tasks_limit,
            top_users: self.top_users_limit,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
