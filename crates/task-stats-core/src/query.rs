//! # Statistics Queries
//!
//! Read-side operations combining the fact store with the aggregation
//! functions. Nothing is cached; every call recomputes from the store.

use crate::aggregation::{self, AuthorMap, AuthorScore, RankedTask};
use crate::store::{FactStore, StoreError};
use crate::{EventKind, TaskId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;

/// Like and view counts for one task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub likes: u64,
    pub views: u64,
}

/// Metric a top-tasks ranking is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Likes,
    Views,
}

impl SortBy {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Likes => EventKind::Like,
            Self::Views => EventKind::View,
        }
    }
}

/// Result sizes for ranking queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLimits {
    pub top_tasks: usize,
    pub top_users: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            top_tasks: 5,
            top_users: 3,
        }
    }
}

/// Query failures
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Statistics store error: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Whether the caller may succeed by trying again later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
        }
    }
}

/// Answers per-task, top-task and top-user queries
#[derive(Clone)]
pub struct StatisticsService {
    store: Arc<dyn FactStore>,
    limits: QueryLimits,
}

impl StatisticsService {
    pub fn new(store: Arc<dyn FactStore>, limits: QueryLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Like and view counts for one task
    #[instrument(skip(self))]
    pub async fn task_stats(&self, task: TaskId) -> Result<TaskStats, QueryError> {
        let likes = self.store.count_by_task(task, EventKind::Like).await?;
        let views = self.store.count_by_task(task, EventKind::View).await?;
        Ok(TaskStats { likes, views })
    }

    /// Highest-ranked tasks by likes or views
    #[instrument(skip(self, authors))]
    pub async fn top_tasks(
        &self,
        sort: SortBy,
        authors: &AuthorMap,
    ) -> Result<Vec<RankedTask>, QueryError> {
        let counts = self
            .store
            .top_by_count(sort.kind(), self.limits.top_tasks)
            .await?;
        Ok(aggregation::top_tasks(
            &counts,
            authors,
            self.limits.top_tasks,
        ))
    }

    /// Authors with the most likes across their tasks
    #[instrument(skip(self, authors))]
    pub async fn top_users(&self, authors: &AuthorMap) -> Result<Vec<AuthorScore>, QueryError> {
        let likes = self.store.group_counts(EventKind::Like).await?;
        Ok(aggregation::top_authors(
            &likes,
            authors,
            self.limits.top_users,
        ))
    }

    /// Verify the store is reachable
    pub async fn health_check(&self) -> Result<(), QueryError> {
        Ok(self.store.health_check().await?)
    }
}
