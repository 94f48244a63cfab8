//! # Fact Store
//!
//! Durable relation holding at most one fact per (user, task, kind).
//!
//! Ingestion only ever calls [`FactStore::ensure_present`], which inserts a
//! fact the first time its natural key is seen and does nothing afterwards.
//! Backends enforce uniqueness on the natural key themselves, so two
//! concurrent deliveries of the same event still leave exactly one fact.
//!
//! Count queries break ties on task id ascending so ranked results do not
//! depend on storage order.

use crate::{EventKind, TaskId, UserLogin};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryFactStore;
pub use postgres::{PostgresFactStore, PostgresStoreConfig};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

// ============================================================================
// Store Types
// ============================================================================

/// One user performing one kind of interaction on one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub user: UserLogin,
    pub task: TaskId,
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
}

/// Number of facts of one kind for one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCount {
    pub task: TaskId,
    pub count: u64,
}

impl TaskCount {
    pub fn new(task: TaskId, count: u64) -> Self {
        Self { task, count }
    }
}

/// Result of an ensure-present call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The fact did not exist and was written
    Inserted,
    /// The fact already existed; nothing was written
    AlreadyPresent,
}

/// Order counts by count descending, then task id ascending
pub(crate) fn rank_counts(counts: &mut [TaskCount]) {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.task.cmp(&b.task)));
}

// ============================================================================
// Store Trait
// ============================================================================

/// Interface for fact persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Record a fact unless one with the same natural key exists
    ///
    /// A uniqueness conflict raised by a concurrent insert is reported as
    /// [`EnsureOutcome::AlreadyPresent`], not as an error.
    async fn ensure_present(
        &self,
        user: &UserLogin,
        task: TaskId,
        kind: EventKind,
    ) -> Result<EnsureOutcome, StoreError>;

    /// Number of facts for one task and kind
    async fn count_by_task(&self, task: TaskId, kind: EventKind) -> Result<u64, StoreError>;

    /// One count per distinct task that has facts of this kind
    async fn group_counts(&self, kind: EventKind) -> Result<Vec<TaskCount>, StoreError>;

    /// The `n` highest counts for this kind, highest first
    async fn top_by_count(&self, kind: EventKind, n: usize) -> Result<Vec<TaskCount>, StoreError>;

    /// Verify the backend is reachable
    async fn health_check(&self) -> Result<(), StoreError>;
}

// ============================================================================
// Error Types
// ============================================================================

/// Storage-layer failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Store operation timed out: {message}")]
    Timeout { message: String },

    #[error("Store query failed: {message}")]
    Query { message: String },

    #[error("Store migration failed: {message}")]
    Migration { message: String },

    #[error("Value for '{field}' cannot be stored: {message}")]
    InvalidValue { field: String, message: String },
}

impl StoreError {
    /// Check if error is transient and the operation may succeed on retry
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Timeout { .. } => true,
            Self::Query { .. } => false,
            Self::Migration { .. } => false,
            Self::InvalidValue { .. } => false,
        }
    }

    /// Suggested wait before retrying
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Unavailable { .. } => Some(Duration::from_secs(1)),
            Self::Timeout { .. } => Some(Duration::from_millis(500)),
            _ => None,
        }
    }
}
