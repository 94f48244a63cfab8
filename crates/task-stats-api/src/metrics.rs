//! Prometheus metrics for the query surface and the ingestion worker.
//!
//! Metrics live in a registry owned by [`ServiceMetrics`] rather than the
//! process-wide default, so several instances can coexist in one process.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;
use task_stats_core::consumer::OutcomeObserver;
use task_stats_core::RouteOutcome;

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

/// Service metrics for observability
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,

    // Query metrics
    pub query_requests_total: IntCounterVec,
    pub query_failures_total: IntCounterVec,

    // Ingestion metrics
    pub ingestion_outcomes_total: IntCounterVec,
    pub ingestion_retries_total: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new_custom(Some("task_stats".to_string()), None)?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.001, 0.01, 0.1, 1.0, 10.0]),
            &["method", "path"],
        )?;
        let query_requests_total = IntCounterVec::new(
            Opts::new("query_requests_total", "Statistics queries answered"),
            &["operation"],
        )?;
        let query_failures_total = IntCounterVec::new(
            Opts::new("query_failures_total", "Statistics queries that failed"),
            &["operation"],
        )?;
        let ingestion_outcomes_total = IntCounterVec::new(
            Opts::new(
                "ingestion_outcomes_total",
                "Log records processed by final outcome",
            ),
            &["outcome"],
        )?;
        let ingestion_retries_total = IntCounter::new(
            "ingestion_retries_total",
            "Store writes retried after a transient failure",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(query_requests_total.clone()))?;
        registry.register(Box::new(query_failures_total.clone()))?;
        registry.register(Box::new(ingestion_outcomes_total.clone()))?;
        registry.register(Box::new(ingestion_retries_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration,
            query_requests_total,
            query_failures_total,
            ingestion_outcomes_total,
            ingestion_retries_total,
        }))
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: Duration) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.http_request_duration
            .with_label_values(&[method, path])
            .observe(duration.as_secs_f64());
    }

    pub fn record_query(&self, operation: &str, success: bool) {
        self.query_requests_total
            .with_label_values(&[operation])
            .inc();
        if !success {
            self.query_failures_total
                .with_label_values(&[operation])
                .inc();
        }
    }

    /// Render every metric in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl OutcomeObserver for ServiceMetrics {
    fn observe(&self, outcome: &RouteOutcome) {
        self.ingestion_outcomes_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    fn observe_retry(&self) {
        self.ingestion_retries_total.inc();
    }
}
