//! Request and response bodies for the query surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use task_stats_core::{AuthorMap, AuthorScore, RankedTask, SortBy, TaskStats};

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /api/tasks/top`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopTasksRequest {
    pub sort: SortBy,

    /// Task id to author login
    #[serde(default)]
    pub authors: AuthorMap,
}

/// Body of `POST /api/users/top`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TopUsersRequest {
    #[serde(default)]
    pub authors: AuthorMap,
}

// ============================================================================
// Response Types
// ============================================================================

/// Body of `GET /api/tasks/{task_id}/stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskStatsResponse {
    pub likes: u64,
    pub views: u64,
}

impl From<TaskStats> for TaskStatsResponse {
    fn from(stats: TaskStats) -> Self {
        Self {
            likes: stats.likes,
            views: stats.views,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopTaskEntry {
    pub id: u64,
    pub count: u64,
    pub author: String,
}

impl From<RankedTask> for TopTaskEntry {
    fn from(ranked: RankedTask) -> Self {
        Self {
            id: ranked.task.as_u64(),
            count: ranked.count,
            author: ranked.author,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopTasksResponse {
    pub tasks: Vec<TopTaskEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopUserEntry {
    pub login: String,
    pub likes: u64,
}

impl From<AuthorScore> for TopUserEntry {
    fn from(score: AuthorScore) -> Self {
        Self {
            login: score.author,
            likes: score.likes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopUsersResponse {
    pub authors: Vec<TopUserEntry>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub timestamp: DateTime<Utc>,
    pub checks: BTreeMap<String, String>,
}
