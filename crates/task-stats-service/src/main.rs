//! # Task-Stats Service
//!
//! Binary entry point for the Task-Stats service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Connects the fact store and the log broker
//! - Runs the ingestion worker in the background
//! - Serves the statistics HTTP API until SIGINT/SIGTERM

mod settings;

use std::sync::Arc;
use std::time::Duration;
use stream_runtime::{BrokerConnectorFactory, ConnectionManager, StartOffset};
use task_stats_api::{
    config::{LoggingConfig, StoreBackend},
    shutdown_signal, start_server, AppState, ConfigError, ServiceConfig, ServiceError,
    ServiceMetrics,
};
use task_stats_core::consumer::{IngestionWorker, OutcomeObserver};
use task_stats_core::store::{FactStore, InMemoryFactStore, PostgresFactStore};
use task_stats_core::{IngestionRouter, StatisticsService};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let loaded = settings::load_configuration();

    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(ServiceError::Configuration(e).exit_code());
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Task-Stats Service"
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "Task-Stats Service failed");
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: ServiceConfig) -> Result<(), ServiceError> {
    // -------------------------------------------------------------------------
    // Fact store
    // -------------------------------------------------------------------------
    let store: Arc<dyn FactStore> = match config.store.backend {
        StoreBackend::Postgres => {
            let store = PostgresFactStore::connect(&config.store.postgres_config())
                .await
                .map_err(|e| ServiceError::StoreUnavailable {
                    message: e.to_string(),
                })?;
            info!("Connected to PostgreSQL fact store");
            Arc::new(store)
        }
        StoreBackend::InMemory => {
            warn!("Using in-memory fact store; facts are lost on restart");
            Arc::new(InMemoryFactStore::new())
        }
    };

    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    // -------------------------------------------------------------------------
    // Log broker
    //
    // connect() only returns once the broker accepted a connection. Failing to
    // open the partition afterwards is fatal.
    // -------------------------------------------------------------------------
    let broker_config = config.broker.broker_config();
    let connector = BrokerConnectorFactory::create(&broker_config.provider).map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: e.to_string(),
        })
    })?;
    let manager = ConnectionManager::new(connector, broker_config.connect_retry_delay);
    let connection = manager.connect().await;

    let stream = config.broker.stream_name()?;
    let partition = config.broker.partition_index()?;
    let reader = match connection
        .open_partition(&stream, partition, StartOffset::Newest)
        .await
    {
        Ok(reader) => reader,
        Err(e) => {
            connection.release();
            return Err(ServiceError::ReaderOpenFailed {
                message: e.to_string(),
            });
        }
    };

    // -------------------------------------------------------------------------
    // Ingestion worker
    // -------------------------------------------------------------------------
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let observer: Arc<dyn OutcomeObserver> = metrics.clone();
    let worker = IngestionWorker::new(
        IngestionRouter::new(store.clone()),
        config.ingestion.retry.retry_policy(),
    )
    .with_observer(observer);
    let worker_handle = tokio::spawn(worker.run(reader, shutdown_rx));

    // -------------------------------------------------------------------------
    // HTTP server
    // -------------------------------------------------------------------------
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let statistics = StatisticsService::new(store, config.queries.limits());
    let state = AppState::new(config, statistics, metrics);
    let served = start_server(state, shutdown_signal()).await;

    // -------------------------------------------------------------------------
    // Shutdown
    // -------------------------------------------------------------------------
    shutdown_tx.send_replace(true);
    connection.release();

    match tokio::time::timeout(shutdown_timeout, worker_handle).await {
        Ok(Ok(summary)) => info!(
            recorded = summary.recorded,
            duplicates = summary.duplicates,
            ignored = summary.ignored,
            malformed = summary.malformed,
            failed = summary.failed,
            retries = summary.retries,
            read_errors = summary.read_errors,
            "Ingestion worker finished"
        ),
        Ok(Err(e)) => error!(error = %e, "Ingestion worker task failed"),
        Err(_) => warn!(
            timeout_seconds = shutdown_timeout.as_secs(),
            "Ingestion worker did not stop in time"
        ),
    }

    served
}
