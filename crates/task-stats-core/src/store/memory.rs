//! In-memory fact store for testing and development.
//!
//! Facts live in a map keyed by natural key. The existence check and the
//! insert happen under one write lock, which is what makes concurrent
//! duplicates collapse into a single fact.

use super::{rank_counts, EnsureOutcome, Fact, FactStore, StoreError, TaskCount};
use crate::{EventKind, TaskId, UserLogin};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

type NaturalKey = (UserLogin, TaskId, EventKind);

/// Fact store held in process memory
#[derive(Clone, Default)]
pub struct InMemoryFactStore {
    facts: Arc<RwLock<HashMap<NaturalKey, DateTime<Utc>>>>,
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored fact, ordered by natural key
    pub fn facts(&self) -> Result<Vec<Fact>, StoreError> {
        let facts = self.facts.read().map_err(poisoned)?;
        let mut snapshot: Vec<Fact> = facts
            .iter()
            .map(|((user, task, kind), created_at)| Fact {
                user: user.clone(),
                task: *task,
                kind: *kind,
                created_at: *created_at,
            })
            .collect();
        snapshot.sort_by(|a, b| (&a.user, a.task, a.kind).cmp(&(&b.user, b.task, b.kind)));
        Ok(snapshot)
    }

    /// Total number of stored facts
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.facts.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn counts(&self, kind: EventKind) -> Result<Vec<TaskCount>, StoreError> {
        let facts = self.facts.read().map_err(poisoned)?;
        let mut per_task: HashMap<TaskId, u64> = HashMap::new();
        for (_, task, _) in facts.keys().filter(|(_, _, k)| *k == kind) {
            *per_task.entry(*task).or_insert(0) += 1;
        }
        Ok(per_task
            .into_iter()
            .map(|(task, count)| TaskCount::new(task, count))
            .collect())
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable {
        message: format!("fact map lock poisoned: {}", e),
    }
}

#[async_trait]
impl FactStore for InMemoryFactStore {
    async fn ensure_present(
        &self,
        user: &UserLogin,
        task: TaskId,
        kind: EventKind,
    ) -> Result<EnsureOutcome, StoreError> {
        let mut facts = self.facts.write().map_err(poisoned)?;
        let key = (user.clone(), task, kind);

        if facts.contains_key(&key) {
            return Ok(EnsureOutcome::AlreadyPresent);
        }

        facts.insert(key, Utc::now());
        Ok(EnsureOutcome::Inserted)
    }

    async fn count_by_task(&self, task: TaskId, kind: EventKind) -> Result<u64, StoreError> {
        let facts = self.facts.read().map_err(poisoned)?;
        Ok(facts
            .keys()
            .filter(|(_, t, k)| *t == task && *k == kind)
            .count() as u64)
    }

    async fn group_counts(&self, kind: EventKind) -> Result<Vec<TaskCount>, StoreError> {
        let mut counts = self.counts(kind)?;
        counts.sort_by_key(|c| c.task);
        Ok(counts)
    }

    async fn top_by_count(&self, kind: EventKind, n: usize) -> Result<Vec<TaskCount>, StoreError> {
        let mut counts = self.counts(kind)?;
        rank_counts(&mut counts);
        counts.truncate(n);
        Ok(counts)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let _facts = self.facts.read().map_err(poisoned)?;
        Ok(())
    }
}
