//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use task_stats_core::QueryError;
use tracing::{error, warn};

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Query handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: the request cannot be answered as written
/// - `500 Internal Server Error`: the store rejected the query
/// - `503 Service Unavailable`: the store is temporarily unreachable;
///   a `Retry-After` header is set
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Query failed: {0}")]
    QueryFailed(#[from] QueryError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::QueryFailed(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::QueryFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::QueryFailed(QueryError::Store(e)) => e.retry_after().map(|d| d.as_secs().max(1)),
            Self::InvalidRequest { .. } => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = self.retry_after_seconds();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Store details stay in the log
            error!(error = %self, "Statistics query failed");
            "Internal server error occurred. Please try again later.".to_string()
        } else {
            warn!(error = %self, status = %status, "Statistics query rejected");
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut response = (status, Json(body)).into_response();

        if let Some(retry_seconds) = retry_after {
            if let Ok(header_value) = retry_seconds.to_string().parse() {
                response.headers_mut().insert("Retry-After", header_value);
            }
        }

        response
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Statistics store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Failed to open partition reader: {message}")]
    ReaderOpenFailed { message: String },
}

impl ServiceError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) => 3,
            Self::StoreUnavailable { .. } => 4,
            Self::ReaderOpenFailed { .. } => 5,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Failed to load configuration: {message}")]
    Load { message: String },
}
