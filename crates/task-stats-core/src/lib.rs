//! # Task-Stats Core
//!
//! Core business logic for the Task-Stats service: turning like/view events
//! read from a partitioned log into deduplicated facts, and answering
//! aggregate queries over those facts.
//!
//! ## Architecture
//!
//! - [`event`] decodes the records carried by the log
//! - [`ingestion`] routes each record to the fact store
//! - [`consumer`] runs the background pull loop over a partition reader
//! - [`store`] holds facts, at most one per (user, task, kind)
//! - [`aggregation`] ranks tasks and authors from store results
//! - [`query`] composes the store and the aggregation functions
//!
//! Business logic depends only on the [`store::FactStore`] trait and the
//! `stream-runtime` reader traits; backends are injected at startup.
//!
//! ## Usage
//!
//! ```rust
//! use task_stats_core::{EventKind, TaskId, UserLogin};
//!
//! let kind = EventKind::from_routing_key("Like");
//! assert_eq!(kind, Some(EventKind::Like));
//!
//! let user = UserLogin::new("alice").unwrap();
//! let task = TaskId::new(42);
//! assert_eq!(format!("{user}/{task}"), "alice/42");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod aggregation;
pub mod consumer;
pub mod event;
pub mod ingestion;
pub mod query;
pub mod retry;
pub mod store;

pub use aggregation::{AuthorMap, AuthorScore, RankedTask};
pub use event::{DecodeError, StatEvent};
pub use ingestion::{IngestionRouter, RouteOutcome};
pub use query::{QueryError, QueryLimits, SortBy, StatisticsService, TaskStats};
pub use store::{EnsureOutcome, FactStore, StoreError, TaskCount};

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Login of the user who performed an action
///
/// Opaque to this service apart from being non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserLogin(String);

impl UserLogin {
    /// Create new user login with validation
    pub fn new(login: impl Into<String>) -> Result<Self, ValidationError> {
        let login = login.into();
        if login.is_empty() {
            return Err(ValidationError::Required {
                field: "login".to_string(),
            });
        }
        Ok(Self(login))
    }

    /// Get login as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserLogin {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifier of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "task_id".to_string(),
                message: e.to_string(),
            })
    }
}

/// Kind of interaction recorded as a fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Like,
    View,
}

impl EventKind {
    /// All known kinds
    pub const ALL: [EventKind; 2] = [EventKind::Like, EventKind::View];

    /// Map a log routing key onto a kind
    ///
    /// Keys are matched exactly; anything else is a kind this service does
    /// not know about.
    pub fn from_routing_key(key: &str) -> Option<Self> {
        match key {
            "Like" => Some(Self::Like),
            "View" => Some(Self::View),
            _ => None,
        }
    }

    /// Routing key producers publish this kind under
    pub fn routing_key(&self) -> &'static str {
        match self {
            Self::Like => "Like",
            Self::View => "View",
        }
    }

    /// Lowercase name used in storage and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::View => "view",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "view" => Ok(Self::View),
            other => Err(ValidationError::InvalidFormat {
                field: "kind".to_string(),
                message: format!("unknown event kind '{}'", other),
            }),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
