//! # Aggregation
//!
//! Pure ranking functions over counts already read from the fact store.
//!
//! Authorship is not owned by this service; callers pass an [`AuthorMap`]
//! with every query. Mapping entries for tasks that have no counts are
//! ignored, and an empty author name is treated the same as no entry.

use crate::store::TaskCount;
use crate::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(test)]
#[path = "aggregation_tests.rs"]
mod tests;

/// Task to author login, supplied per request
pub type AuthorMap = HashMap<TaskId, String>;

/// A task in a top-tasks ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedTask {
    pub task: TaskId,
    pub count: u64,
    /// Empty when the caller supplied no author for this task
    pub author: String,
}

/// An author's like total across their tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorScore {
    pub author: String,
    pub likes: u64,
}

/// Attach authors to ranked task counts
///
/// `counts` is expected in ranking order, as returned by
/// [`crate::store::FactStore::top_by_count`]; that order is kept and the
/// result is cut to `n` entries.
pub fn top_tasks(counts: &[TaskCount], authors: &AuthorMap, n: usize) -> Vec<RankedTask> {
    counts
        .iter()
        .take(n)
        .map(|c| RankedTask {
            task: c.task,
            count: c.count,
            author: authors.get(&c.task).cloned().unwrap_or_default(),
        })
        .collect()
}

/// Roll per-task like counts up into per-author totals
///
/// Totals are ordered highest first; equal totals are ordered by author
/// login ascending. Tasks without an author are left out.
pub fn top_authors(like_counts: &[TaskCount], authors: &AuthorMap, n: usize) -> Vec<AuthorScore> {
    let mut totals: HashMap<&str, u64> = HashMap::new();

    for count in like_counts {
        match authors.get(&count.task) {
            Some(author) if !author.is_empty() => {
                *totals.entry(author.as_str()).or_insert(0) += count.count;
            }
            _ => {}
        }
    }

    let mut scores: Vec<AuthorScore> = totals
        .into_iter()
        .map(|(author, likes)| AuthorScore {
            author: author.to_string(),
            likes,
        })
        .collect();

    scores.sort_by(|a, b| b.likes.cmp(&a.likes).then_with(|| a.author.cmp(&b.author)));
    scores.truncate(n);
    scores
}
