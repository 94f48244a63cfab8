//! Tests for the statistics query service.

use super::*;
use crate::store::{InMemoryFactStore, MockFactStore};
use crate::UserLogin;

async fn add(store: &InMemoryFactStore, user: &str, task: u64, kind: EventKind) {
    store
        .ensure_present(&UserLogin::new(user).unwrap(), TaskId::new(task), kind)
        .await
        .unwrap();
}

fn author_map(pairs: &[(u64, &str)]) -> AuthorMap {
    pairs
        .iter()
        .map(|(task, author)| (TaskId::new(*task), author.to_string()))
        .collect()
}

#[tokio::test]
async fn test_task_stats_counts_likes_and_views() {
    let store = Arc::new(InMemoryFactStore::new());
    add(&store, "u1", 42, EventKind::Like).await;
    add(&store, "u1", 42, EventKind::View).await;
    add(&store, "u2", 42, EventKind::View).await;
    let service = StatisticsService::new(store, QueryLimits::default());

    let stats = service.task_stats(TaskId::new(42)).await.unwrap();

    assert_eq!(stats, TaskStats { likes: 1, views: 2 });
}

#[tokio::test]
async fn test_task_stats_for_unknown_task_is_zero() {
    let store = Arc::new(InMemoryFactStore::new());
    let service = StatisticsService::new(store, QueryLimits::default());

    let stats = service.task_stats(TaskId::new(1)).await.unwrap();

    assert_eq!(stats, TaskStats::default());
}

#[tokio::test]
async fn test_top_tasks_by_views_uses_limit_and_authors() {
    let store = Arc::new(InMemoryFactStore::new());
    for (task, viewers) in [(1u64, 1usize), (2, 3), (3, 2)] {
        for i in 0..viewers {
            add(&store, &format!("v{i}"), task, EventKind::View).await;
        }
    }
    add(&store, "u1", 1, EventKind::Like).await;
    let limits = QueryLimits {
        top_tasks: 2,
        top_users: 3,
    };
    let service = StatisticsService::new(store, limits);

    let top = service
        .top_tasks(SortBy::Views, &author_map(&[(2, "bob")]))
        .await
        .unwrap();

    assert_eq!(
        top,
        vec![
            RankedTask {
                task: TaskId::new(2),
                count: 3,
                author: "bob".to_string()
            },
            RankedTask {
                task: TaskId::new(3),
                count: 2,
                author: String::new()
            },
        ]
    );
}

#[tokio::test]
async fn test_top_users_rolls_up_likes() {
    let store = Arc::new(InMemoryFactStore::new());
    for user in ["a", "b", "c"] {
        add(&store, user, 1, EventKind::Like).await;
    }
    add(&store, "a", 2, EventKind::Like).await;
    add(&store, "a", 3, EventKind::Like).await;
    add(&store, "b", 3, EventKind::Like).await;
    add(&store, "z", 3, EventKind::View).await;
    let service = StatisticsService::new(store, QueryLimits::default());

    let top = service
        .top_users(&author_map(&[(1, "alice"), (2, "bob"), (3, "bob")]))
        .await
        .unwrap();

    assert_eq!(
        top,
        vec![
            AuthorScore {
                author: "alice".to_string(),
                likes: 3
            },
            AuthorScore {
                author: "bob".to_string(),
                likes: 3
            },
        ]
    );
}

#[tokio::test]
async fn test_store_failure_surfaces_as_query_error() {
    let mut store = MockFactStore::new();
    store.expect_count_by_task().returning(|_, _| {
        Err(StoreError::Unavailable {
            message: "no route to host".to_string(),
        })
    });
    let service = StatisticsService::new(Arc::new(store), QueryLimits::default());

    let result = service.task_stats(TaskId::new(1)).await;

    match result {
        Err(e) => assert!(e.is_transient()),
        Ok(stats) => panic!("Expected store error, got: {:?}", stats),
    }
}

#[test]
fn test_sort_by_parses_lowercase_names() {
    let likes: SortBy = serde_json::from_str("\"likes\"").unwrap();
    let views: SortBy = serde_json::from_str("\"views\"").unwrap();

    assert_eq!(likes.kind(), EventKind::Like);
    assert_eq!(views.kind(), EventKind::View);
    assert!(serde_json::from_str::<SortBy>("\"shares\"").is_err());
}
