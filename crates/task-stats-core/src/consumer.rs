//! # Ingestion Worker
//!
//! The single background loop that pulls records from a partition reader and
//! routes them into the fact store.
//!
//! The loop ends when the reader ends (its connection was released), when
//! the reader reports a permanent error, or when shutdown is signalled.
//! Transient read errors pause for the error's suggested delay and reading
//! resumes. A failing record never stops the loop: after the
//! optional retry policy is exhausted the record is abandoned and the next
//! one is read, leaving redelivery to the log.

use crate::ingestion::{IngestionRouter, RouteOutcome};
use crate::retry::{RetryPolicy, RetryState};
use serde::Serialize;
use std::sync::Arc;
use stream_runtime::{LogRecord, PartitionReader};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;

/// Receives every final routing outcome, for metrics
pub trait OutcomeObserver: Send + Sync {
    fn observe(&self, outcome: &RouteOutcome);

    fn observe_retry(&self) {}
}

/// Per-outcome counts for one worker run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionSummary {
    pub recorded: u64,
    pub duplicates: u64,
    pub ignored: u64,
    pub malformed: u64,
    pub failed: u64,
    pub retries: u64,
    /// Records the reader itself failed to deliver
    pub read_errors: u64,
}

impl IngestionSummary {
    fn count(&mut self, outcome: &RouteOutcome) {
        match outcome {
            RouteOutcome::Recorded { .. } => self.recorded += 1,
            RouteOutcome::Duplicate { .. } => self.duplicates += 1,
            RouteOutcome::Ignored { .. } => self.ignored += 1,
            RouteOutcome::Malformed(_) => self.malformed += 1,
            RouteOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Records that reached the router
    pub fn routed(&self) -> u64 {
        self.recorded + self.duplicates + self.ignored + self.malformed + self.failed
    }
}

/// Background consumer of one partition
pub struct IngestionWorker {
    router: IngestionRouter,
    retry_policy: RetryPolicy,
    observer: Option<Arc<dyn OutcomeObserver>>,
}

impl IngestionWorker {
    pub fn new(router: IngestionRouter, retry_policy: RetryPolicy) -> Self {
        Self {
            router,
            retry_policy,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn OutcomeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Consume until the reader ends, fails permanently, or `shutdown` becomes `true`
    pub async fn run(
        self,
        mut reader: Box<dyn PartitionReader>,
        mut shutdown: watch::Receiver<bool>,
    ) -> IngestionSummary {
        let mut summary = IngestionSummary::default();
        let stream = reader.stream().to_string();
        let partition = reader.partition();

        info!(stream = %stream, partition = %partition, "Ingestion worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => {
                    debug!("Ingestion worker received shutdown signal");
                    break;
                }
                next = reader.next_record() => next,
            };

            match next {
                None => {
                    info!(stream = %stream, partition = %partition, "Partition reader ended");
                    break;
                }
                Some(Err(e)) if e.is_transient() => {
                    summary.read_errors += 1;
                    warn!(
                        stream = %stream,
                        partition = %partition,
                        error = %e,
                        "Failed to read record"
                    );
                    if let Some(delay) = e.retry_after() {
                        tokio::select! {
                            biased;
                            _ = stop_requested(&mut shutdown) => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
                Some(Err(e)) => {
                    summary.read_errors += 1;
                    error!(
                        stream = %stream,
                        partition = %partition,
                        error = %e,
                        "Partition reader failed permanently"
                    );
                    break;
                }
                Some(Ok(record)) => {
                    let outcome = self.process(&record, &mut summary, &mut shutdown).await;
                    summary.count(&outcome);
                    if let Some(observer) = &self.observer {
                        observer.observe(&outcome);
                    }
                }
            }
        }

        info!(
            stream = %stream,
            partition = %partition,
            recorded = summary.recorded,
            duplicates = summary.duplicates,
            ignored = summary.ignored,
            malformed = summary.malformed,
            failed = summary.failed,
            "Ingestion worker stopped"
        );
        summary
    }

    async fn process(
        &self,
        record: &LogRecord,
        summary: &mut IngestionSummary,
        shutdown: &mut watch::Receiver<bool>,
    ) -> RouteOutcome {
        let mut state = RetryState::new();
        let mut outcome = self.router.route(record).await;

        while outcome.is_transient_failure() && state.can_retry(&self.retry_policy) {
            let delay = state.next_delay(&self.retry_policy);
            warn!(
                offset = record.offset,
                attempt = state.total_attempts(),
                retry_in_ms = delay.as_millis() as u64,
                "Transient store failure; retrying record"
            );

            tokio::select! {
                biased;
                _ = stop_requested(shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }

            state.next_attempt();
            summary.retries += 1;
            if let Some(observer) = &self.observer {
                observer.observe_retry();
            }
            outcome = self.router.route(record).await;
        }

        if let RouteOutcome::Failed(e) = &outcome {
            error!(
                offset = record.offset,
                attempts = state.total_attempts(),
                error = %e,
                "Abandoning record after store failure"
            );
        }

        outcome
    }
}

/// Resolves once `shutdown` reads `true`; never resolves if the sender is gone
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Run an [`IngestionWorker`] without an observer
pub async fn run_ingestion(
    reader: Box<dyn PartitionReader>,
    router: IngestionRouter,
    retry_policy: RetryPolicy,
    shutdown: watch::Receiver<bool>,
) -> IngestionSummary {
    IngestionWorker::new(router, retry_policy)
        .run(reader, shutdown)
        .await
}
