//! # Connection Management
//!
//! Establishes broker connections with an indefinite fixed-delay retry and
//! owns their release.
//!
//! The broker may come up after this service during deployment, so a failed
//! connection attempt is logged and retried rather than reported. Once
//! connected, the returned [`Connection`] is the only way to open partition
//! readers, and releasing it ends every reader opened from it.

use crate::client::{BrokerConnection, BrokerConnector, PartitionReader};
use crate::error::StreamError;
use crate::message::{LogRecord, PartitionIndex, StartOffset, StreamName};
use crate::provider::ProviderType;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;

// ============================================================================
// Connection Manager
// ============================================================================

/// Connects to a broker, retrying until it succeeds
pub struct ConnectionManager {
    connector: Arc<dyn BrokerConnector>,
    retry_delay: Duration,
}

impl ConnectionManager {
    /// Default delay between connection attempts
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

    /// Create a manager for the given connector
    pub fn new(connector: Arc<dyn BrokerConnector>, retry_delay: Duration) -> Self {
        Self {
            connector,
            retry_delay,
        }
    }

    /// Block until a usable connection is obtained
    ///
    /// Connection errors are never returned; every failed attempt is logged
    /// and followed by a fixed delay.
    pub async fn connect(&self) -> Connection {
        let provider = self.connector.provider_type();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match self.connector.connect().await {
                Ok(inner) => {
                    info!(
                        provider = %provider,
                        attempts = attempt,
                        "Log broker is ready"
                    );
                    return Connection::new(inner);
                }
                Err(e) => {
                    warn!(
                        provider = %provider,
                        attempt = attempt,
                        error = %e,
                        retry_in_ms = self.retry_delay.as_millis() as u64,
                        "Waiting for log broker"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A live broker connection
///
/// Call [`Connection::release`] during orderly shutdown. A connection that
/// is dropped without being released is closed from `Drop`, so the broker
/// connection is closed exactly once on every exit path.
pub struct Connection {
    inner: Box<dyn BrokerConnection>,
    closed: watch::Sender<bool>,
    released: bool,
}

impl Connection {
    fn new(inner: Box<dyn BrokerConnection>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            inner,
            closed,
            released: false,
        }
    }

    /// Get provider type
    pub fn provider_type(&self) -> ProviderType {
        self.inner.provider_type()
    }

    /// Open a sequential reader over one partition
    ///
    /// The returned reader yields `None` as soon as this connection is
    /// released, even while it is waiting for a record.
    pub async fn open_partition(
        &self,
        stream: &StreamName,
        partition: PartitionIndex,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionReader>, StreamError> {
        if self.released || *self.closed.borrow() {
            return Err(StreamError::ConnectionClosed);
        }

        let reader = self.inner.open_partition(stream, partition, start).await?;

        info!(
            stream = %stream,
            partition = %partition,
            start = ?start,
            "Opened partition reader"
        );

        Ok(Box::new(ReleasableReader {
            inner: reader,
            closed: self.closed.subscribe(),
        }))
    }

    /// Close the connection, ending every reader opened from it
    pub fn release(mut self) {
        self.close_once();
        info!(provider = %self.inner.provider_type(), "Released log broker connection");
    }

    fn close_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.closed.send_replace(true);
        self.inner.close();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                provider = %self.inner.provider_type(),
                "Connection dropped without release; closing"
            );
            self.close_once();
        }
    }
}

// ============================================================================
// Releasable Reader
// ============================================================================

/// Reader wrapper that ends when its connection is released
struct ReleasableReader {
    inner: Box<dyn PartitionReader>,
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl PartitionReader for ReleasableReader {
    async fn next_record(&mut self) -> Option<Result<LogRecord, StreamError>> {
        if *self.closed.borrow() {
            return None;
        }

        let Self { inner, closed } = self;
        let partition = inner.partition();

        tokio::select! {
            biased;
            _ = closed.wait_for(|is_closed| *is_closed) => {
                debug!(partition = %partition, "Reader stopped by connection release");
                None
            }
            record = inner.next_record() => record,
        }
    }

    fn stream(&self) -> &StreamName {
        self.inner.stream()
    }

    fn partition(&self) -> PartitionIndex {
        self.inner.partition()
    }
}
