//! Event records carried by the statistics stream.
//!
//! The routing key of a log record names the [`EventKind`]; the value is a
//! JSON object identifying who acted on which task:
//!
//! ```json
//! {"login": "alice", "task_id": 42}
//! ```
//!
//! Unknown JSON fields are ignored so producers can add fields without
//! breaking this consumer.

use crate::{TaskId, UserLogin};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

/// Payload of a like or view record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEvent {
    pub login: String,
    pub task_id: u64,
}

impl StatEvent {
    pub fn new(login: impl Into<String>, task_id: u64) -> Self {
        Self {
            login: login.into(),
            task_id,
        }
    }

    /// Decode a record value
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let event: Self = serde_json::from_slice(payload)?;
        if event.login.is_empty() {
            return Err(DecodeError::EmptyLogin);
        }
        Ok(event)
    }

    /// Encode as a record value
    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Validated login of the acting user
    pub fn user(&self) -> Result<UserLogin, DecodeError> {
        UserLogin::new(self.login.as_str()).map_err(|_| DecodeError::EmptyLogin)
    }

    pub fn task(&self) -> TaskId {
        TaskId::new(self.task_id)
    }
}

/// Failure to interpret a record value
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Event payload has an empty login")]
    EmptyLogin,
}
