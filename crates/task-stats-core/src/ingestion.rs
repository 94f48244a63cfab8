//! # Ingestion Router
//!
//! Dispatches each raw log record to the fact store operation for its kind.
//!
//! The record key names the kind. Unknown keys are ignored so that new
//! event kinds can be published before this service understands them.
//! Undecodable payloads are logged and dropped; neither case is an error for
//! the consuming loop.

use crate::event::{DecodeError, StatEvent};
use crate::store::{EnsureOutcome, FactStore, StoreError};
use crate::{EventKind, TaskId};
use std::sync::Arc;
use stream_runtime::LogRecord;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "ingestion_tests.rs"]
mod tests;

/// What happened to one routed record
#[derive(Debug)]
pub enum RouteOutcome {
    /// A new fact was stored
    Recorded { kind: EventKind, task: TaskId },
    /// The fact already existed
    Duplicate { kind: EventKind, task: TaskId },
    /// The key is missing or names an unknown kind
    Ignored { key: Option<String> },
    /// The payload could not be decoded
    Malformed(DecodeError),
    /// The store rejected the write
    Failed(StoreError),
}

impl RouteOutcome {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded { .. } => "recorded",
            Self::Duplicate { .. } => "duplicate",
            Self::Ignored { .. } => "ignored",
            Self::Malformed(_) => "malformed",
            Self::Failed(_) => "failed",
        }
    }

    /// Whether the store failed in a way that may succeed on retry
    pub fn is_transient_failure(&self) -> bool {
        matches!(self, Self::Failed(e) if e.is_transient())
    }
}

/// Routes records into a [`FactStore`]
#[derive(Clone)]
pub struct IngestionRouter {
    store: Arc<dyn FactStore>,
}

impl IngestionRouter {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self { store }
    }

    /// Route one record
    pub async fn route(&self, record: &LogRecord) -> RouteOutcome {
        let kind = match record.key_str().and_then(EventKind::from_routing_key) {
            Some(kind) => kind,
            None => {
                let key = record
                    .key
                    .as_ref()
                    .map(|k| String::from_utf8_lossy(k).into_owned());
                debug!(
                    offset = record.offset,
                    key = ?key,
                    "Ignoring record with unknown kind"
                );
                return RouteOutcome::Ignored { key };
            }
        };

        let event = match StatEvent::decode(&record.value) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    offset = record.offset,
                    kind = %kind,
                    error = %e,
                    "Dropping malformed event"
                );
                return RouteOutcome::Malformed(e);
            }
        };

        let user = match event.user() {
            Ok(user) => user,
            Err(e) => return RouteOutcome::Malformed(e),
        };
        let task = event.task();

        match self.store.ensure_present(&user, task, kind).await {
            Ok(EnsureOutcome::Inserted) => {
                debug!(offset = record.offset, kind = %kind, task_id = %task, "Recorded fact");
                RouteOutcome::Recorded { kind, task }
            }
            Ok(EnsureOutcome::AlreadyPresent) => {
                debug!(
                    offset = record.offset,
                    kind = %kind,
                    task_id = %task,
                    "Fact already present"
                );
                RouteOutcome::Duplicate { kind, task }
            }
            Err(e) => RouteOutcome::Failed(e),
        }
    }
}
