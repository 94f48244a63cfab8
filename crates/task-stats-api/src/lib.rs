//! # Task-Stats HTTP Service
//!
//! HTTP surface over the statistics queries of `task-stats-core`.
//!
//! This service provides:
//! - Per-task like and view counts
//! - Top tasks by likes or views, and top authors by likes
//! - Liveness, readiness and Prometheus metrics endpoints
//!
//! Every query is answered from the fact store at request time.

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::ServiceConfig;
pub use errors::{ApiError, ConfigError, ServiceError};
pub use metrics::ServiceMetrics;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use responses::{
    HealthResponse, ReadinessResponse, TaskStatsResponse, TopTasksRequest, TopTasksResponse,
    TopUsersRequest, TopUsersResponse,
};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use task_stats_core::{StatisticsService, TaskId};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Query service backed by the fact store
    pub statistics: StatisticsService,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        statistics: StatisticsService,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            statistics,
            metrics,
        }
    }
}

// ============================================================================
// Router and Server
// ============================================================================

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let query_routes = Router::new()
        .route("/api/tasks/{task_id}/stats", get(handle_task_stats))
        .route("/api/tasks/top", post(handle_top_tasks))
        .route("/api/users/top", post(handle_top_users));

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(query_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Bind the configured address and serve until `shutdown` completes
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let host = state.config.server.host.clone();
    let port = state.config.server.port;
    let address = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %address, "Starting HTTP server");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolve on SIGINT (Ctrl+C) or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

// ============================================================================
// Query Handlers
// ============================================================================

/// Like and view counts for one task
#[instrument(skip(state))]
async fn handle_task_stats(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatsResponse>, ApiError> {
    let task = task_id.parse::<TaskId>().map_err(|e| ApiError::InvalidRequest {
        message: e.to_string(),
    })?;

    let result = state.statistics.task_stats(task).await;
    state.metrics.record_query("task_stats", result.is_ok());

    Ok(Json(result?.into()))
}

/// Highest-ranked tasks by likes or views
#[instrument(skip_all, fields(sort = ?request.sort, authors = request.authors.len()))]
async fn handle_top_tasks(
    State(state): State<AppState>,
    Json(request): Json<TopTasksRequest>,
) -> Result<Json<TopTasksResponse>, ApiError> {
    let result = state
        .statistics
        .top_tasks(request.sort, &request.authors)
        .await;
    state.metrics.record_query("top_tasks", result.is_ok());

    Ok(Json(TopTasksResponse {
        tasks: result?.into_iter().map(Into::into).collect(),
    }))
}

/// Authors with the most likes
#[instrument(skip_all, fields(authors = request.authors.len()))]
async fn handle_top_users(
    State(state): State<AppState>,
    Json(request): Json<TopUsersRequest>,
) -> Result<Json<TopUsersResponse>, ApiError> {
    let result = state.statistics.top_users(&request.authors).await;
    state.metrics.record_query("top_users", result.is_ok());

    Ok(Json(TopUsersResponse {
        authors: result?.into_iter().map(Into::into).collect(),
    }))
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Liveness check; succeeds while the process serves requests
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check; requires the fact store to be reachable
#[instrument(skip(state))]
async fn handle_readiness_check(State(state): State<AppState>) -> Response {
    let mut checks = BTreeMap::new();
    let ready = match state.statistics.health_check().await {
        Ok(()) => {
            checks.insert("store".to_string(), "ok".to_string());
            true
        }
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            checks.insert("store".to_string(), e.to_string());
            false
        }
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = ReadinessResponse {
        ready,
        timestamp: Utc::now(),
        checks,
    };

    (status, Json(body)).into_response()
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.render().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Log each request at a level matching its response status
async fn request_logging_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

/// Record request count and duration, labelled by normalized path
async fn metrics_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();
    let method = request.method().to_string();
    let path = normalize_path_for_metrics(request.uri().path());

    let response = next.run(request).await;

    state.metrics.record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}

/// Normalize path for metrics to avoid cardinality explosion
///
/// Converts paths like `/api/tasks/12345/stats` to `/api/tasks/:id/stats`
fn normalize_path_for_metrics(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
