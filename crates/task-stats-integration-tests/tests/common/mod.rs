//! Common test utilities for Task-Stats integration tests
//!
//! [`Pipeline`] wires the same parts the service binary does, with the
//! in-memory broker and store standing in for Kafka and PostgreSQL:
//! connection manager, partition reader at the newest offset, ingestion
//! worker with the metrics observer, and the axum router.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use stream_runtime::{
    Connection, ConnectionManager, InMemoryBroker, InMemoryConfig, PartitionIndex, StartOffset,
    StreamName,
};
use task_stats_api::{create_router, AppState, ServiceConfig, ServiceMetrics};
use task_stats_core::consumer::{IngestionSummary, IngestionWorker, OutcomeObserver};
use task_stats_core::retry::RetryPolicy;
use task_stats_core::store::InMemoryFactStore;
use task_stats_core::{IngestionRouter, QueryLimits, StatisticsService};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt;

pub const OUTCOMES: [&str; 5] = ["recorded", "duplicate", "ignored", "malformed", "failed"];

pub fn stat_stream() -> StreamName {
    StreamName::new("Stat").unwrap()
}

pub fn partition_zero() -> PartitionIndex {
    PartitionIndex::new(0).unwrap()
}

pub fn event_payload(login: &str, task_id: u64) -> String {
    serde_json::json!({ "login": login, "task_id": task_id }).to_string()
}

// ============================================================================
// Pipeline
// ============================================================================

/// A running ingestion pipeline plus the query router over the same store
pub struct Pipeline {
    pub broker: InMemoryBroker,
    pub store: Arc<InMemoryFactStore>,
    pub metrics: Arc<ServiceMetrics>,
    pub router: Router,
    connection: Option<Connection>,
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<IngestionSummary>>,
}

impl Pipeline {
    pub async fn start() -> Self {
        Self::start_with(InMemoryBroker::default(), Duration::from_millis(10)).await
    }

    /// Connect to `broker` (retrying with `retry_delay`) and start the worker
    pub async fn start_with(broker: InMemoryBroker, retry_delay: Duration) -> Self {
        let store = Arc::new(InMemoryFactStore::new());
        let metrics = ServiceMetrics::new().unwrap();

        let manager = ConnectionManager::new(Arc::new(broker.clone()), retry_delay);
        let connection = manager.connect().await;
        let reader = connection
            .open_partition(&stat_stream(), partition_zero(), StartOffset::Newest)
            .await
            .unwrap();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let observer: Arc<dyn OutcomeObserver> = metrics.clone();
        let ingestion = IngestionRouter::new(store.clone());
        let worker = IngestionWorker::new(ingestion, RetryPolicy::disabled())
            .with_observer(observer);
        let worker = tokio::spawn(worker.run(reader, shutdown_rx));

        let config: ServiceConfig = serde_json::from_value(serde_json::json!({
            "broker": { "provider": "in_memory" },
            "store": { "backend": "in_memory" }
        }))
        .unwrap();
        let statistics = StatisticsService::new(store.clone(), QueryLimits::default());
        let router = create_router(AppState::new(config, statistics, metrics.clone()));

        Self {
            broker,
            store,
            metrics,
            router,
            connection: Some(connection),
            shutdown,
            worker: Some(worker),
        }
    }

    pub fn publish(&self, key: &str, login: &str, task_id: u64) {
        self.publish_raw(Some(key), event_payload(login, task_id));
    }

    pub fn publish_raw(&self, key: Option<&str>, value: impl Into<String>) {
        let value: String = value.into();
        self.broker
            .publish(&stat_stream(), partition_zero(), key, value)
            .unwrap();
    }

    /// Records the worker has finished with, by any outcome
    pub fn processed(&self) -> u64 {
        OUTCOMES
            .iter()
            .map(|outcome| {
                self.metrics
                    .ingestion_outcomes_total
                    .with_label_values(&[*outcome])
                    .get()
            })
            .sum()
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.metrics
            .ingestion_outcomes_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Wait until the worker has processed `count` records
    pub async fn wait_for_processed(&self, count: u64) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.processed() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "worker processed {} of {} records",
                self.processed(),
                count
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Release the broker connection and wait for the worker to end
    pub async fn release(&mut self) -> IngestionSummary {
        if let Some(connection) = self.connection.take() {
            connection.release();
        }
        self.join_worker().await
    }

    /// Signal the worker to stop, then release the connection
    pub async fn shutdown(&mut self) -> IngestionSummary {
        self.shutdown.send_replace(true);
        let summary = self.join_worker().await;
        if let Some(connection) = self.connection.take() {
            connection.release();
        }
        summary
    }

    async fn join_worker(&mut self) -> IngestionSummary {
        let worker = self.worker.take().expect("worker already joined");
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .expect("worker did not stop")
            .unwrap()
    }

    // ------------------------------------------------------------------------
    // HTTP
    // ------------------------------------------------------------------------

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post(
        &self,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }
}

pub fn in_memory_broker(refuse_first_connections: u32) -> InMemoryBroker {
    InMemoryBroker::new(InMemoryConfig {
        refuse_first_connections,
        ..InMemoryConfig::default()
    })
}
