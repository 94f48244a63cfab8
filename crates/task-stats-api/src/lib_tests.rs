//! Tests for the HTTP routes, driven through the router without a socket.

use super::*;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use task_stats_core::store::{EnsureOutcome, FactStore, InMemoryFactStore, StoreError, TaskCount};
use task_stats_core::{EventKind, QueryLimits, UserLogin};
use tower::ServiceExt;

// ============================================================================
// Test Helpers
// ============================================================================

/// Store whose every call fails with the same error
struct FailingStore {
    error: StoreError,
}

#[async_trait]
impl FactStore for FailingStore {
    async fn ensure_present(
        &self,
        _user: &UserLogin,
        _task: TaskId,
        _kind: EventKind,
    ) -> Result<EnsureOutcome, StoreError> {
        Err(self.error.clone())
    }

    async fn count_by_task(&self, _task: TaskId, _kind: EventKind) -> Result<u64, StoreError> {
        Err(self.error.clone())
    }

    async fn group_counts(&self, _kind: EventKind) -> Result<Vec<TaskCount>, StoreError> {
        Err(self.error.clone())
    }

    async fn top_by_count(
        &self,
        _kind: EventKind,
        _n: usize,
    ) -> Result<Vec<TaskCount>, StoreError> {
        Err(self.error.clone())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Err(self.error.clone())
    }
}

fn app_with_store(store: Arc<dyn FactStore>) -> (Router, Arc<ServiceMetrics>) {
    let metrics = ServiceMetrics::new().unwrap();
    let state = AppState::new(
        ServiceConfig::default(),
        StatisticsService::new(store, QueryLimits::default()),
        metrics.clone(),
    );
    (create_router(state), metrics)
}

fn unavailable_app() -> Router {
    let store = FailingStore {
        error: StoreError::Unavailable {
            message: "connection refused".to_string(),
        },
    };
    app_with_store(Arc::new(store)).0
}

async fn seeded_store() -> Arc<InMemoryFactStore> {
    let store = Arc::new(InMemoryFactStore::new());
    let facts = [
        ("u1", 1, EventKind::Like),
        ("u2", 1, EventKind::Like),
        ("u3", 1, EventKind::Like),
        ("u1", 2, EventKind::Like),
        ("u1", 2, EventKind::View),
        ("u2", 3, EventKind::View),
        ("u3", 3, EventKind::View),
    ];
    for (user, task, kind) in facts {
        store
            .ensure_present(&UserLogin::new(user).unwrap(), TaskId::new(task), kind)
            .await
            .unwrap();
    }
    store
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// Query Routes
// ============================================================================

#[tokio::test]
async fn test_task_stats_returns_counts() {
    let (app, _) = app_with_store(seeded_store().await);

    let (status, body) = send(app, get("/api/tasks/2/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "likes": 1, "views": 1 }));
}

#[tokio::test]
async fn test_task_stats_for_unknown_task_is_zero() {
    let (app, _) = app_with_store(seeded_store().await);

    let (status, body) = send(app, get("/api/tasks/999/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "likes": 0, "views": 0 }));
}

#[tokio::test]
async fn test_task_stats_rejects_non_numeric_id() {
    let (app, _) = app_with_store(seeded_store().await);

    let (status, body) = send(app, get("/api/tasks/abc/stats")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_top_tasks_by_likes_with_authors() {
    let (app, _) = app_with_store(seeded_store().await);

    let (status, body) = send(
        app,
        post_json(
            "/api/tasks/top",
            serde_json::json!({ "sort": "likes", "authors": { "1": "alice" } }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({
            "tasks": [
                { "id": 1, "count": 3, "author": "alice" },
                { "id": 2, "count": 1, "author": "" }
            ]
        })
    );
}

#[tokio::test]
async fn test_top_tasks_by_views_without_authors() {
    let (app, _) = app_with_store(seeded_store().await);

    let (status, body) = send(
        app,
        post_json("/api/tasks/top", serde_json::json!({ "sort": "views" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tasks"][0]["id"], 3);
    assert_eq!(body["tasks"][0]["count"], 2);
    assert_eq!(body["tasks"][1]["id"], 2);
}

#[tokio::test]
async fn test_top_tasks_rejects_unknown_sort() {
    let (app, _) = app_with_store(seeded_store().await);

    let response = app
        .oneshot(post_json(
            "/api/tasks/top",
            serde_json::json!({ "sort": "shares" }),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_top_users_rolls_up_by_author() {
    let (app, _) = app_with_store(seeded_store().await);

    let (status, body) = send(
        app,
        post_json(
            "/api/users/top",
            serde_json::json!({ "authors": { "1": "bob", "2": "alice", "3": "alice" } }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({
            "authors": [
                { "login": "bob", "likes": 3 },
                { "login": "alice", "likes": 1 }
            ]
        })
    );
}

#[tokio::test]
async fn test_store_outage_returns_503_body() {
    let response = unavailable_app()
        .oneshot(get("/api/tasks/1/stats"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.headers().contains_key("Retry-After"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], 503);
    assert!(body["timestamp"].is_string());
    assert!(body["error"].as_str().unwrap().contains("unavailable"));
}

// ============================================================================
// Health and Metrics
// ============================================================================

#[tokio::test]
async fn test_health_is_independent_of_store() {
    let (status, body) = send(unavailable_app(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_when_store_reachable() {
    let (app, _) = app_with_store(Arc::new(InMemoryFactStore::new()));

    let (status, body) = send(app, get("/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["checks"]["store"], "ok");
}

#[tokio::test]
async fn test_not_ready_when_store_unreachable() {
    let (status, body) = send(unavailable_app(), get("/ready")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
}

#[tokio::test]
async fn test_metrics_record_queries_and_normalized_paths() {
    let (app, metrics) = app_with_store(seeded_store().await);

    let response = app
        .clone()
        .oneshot(get("/api/tasks/1/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains(
        "task_stats_query_requests_total{operation=\"task_stats\"} 1"
    ));
    assert_eq!(
        metrics
            .http_requests_total
            .with_label_values(&["GET", "/api/tasks/:id/stats", "200"])
            .get(),
        1
    );
}

#[test]
fn test_normalize_path_replaces_numeric_segments() {
    assert_eq!(
        normalize_path_for_metrics("/api/tasks/12345/stats"),
        "/api/tasks/:id/stats"
    );
    assert_eq!(
        normalize_path_for_metrics("/api/tasks/top"),
        "/api/tasks/top"
    );
    assert_eq!(normalize_path_for_metrics("/"), "/");
}
