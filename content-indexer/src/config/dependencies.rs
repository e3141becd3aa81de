//! Dependency initialization and wiring for the content indexer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use content_indexer_repository::{
    ContentStore, IndexService, MongoContentStore, OpenSearchProvider,
};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::settings::{ConnectionMode, Settings};
use crate::consumer::KafkaConsumer;
use crate::delivery::KafkaDeadLetterProducer;
use crate::loader::IndexLoader;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::processor::{ChangeProcessor, ContentChangeHandler};
use crate::reconciler::{Reconciler, SyncScheduler};
use crate::IndexingError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`Settings::from_env`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (only in fail-fast mode
    ///   for connection failures)
    pub async fn new() -> Result<Self, IndexingError> {
        let settings = Settings::from_env()?;
        Self::from_settings(settings).await
    }

    /// Connect every client and wire the ingest from `settings`.
    pub async fn from_settings(settings: Settings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch.url,
            mongodb_database = %settings.mongo.database,
            kafka = ?settings.kafka,
            workers = settings.consumer.workers,
            connection_mode = ?settings.opensearch.connection_mode,
            retry_interval_secs = settings.opensearch.retry_interval.as_secs(),
            sync_cron = %settings.sync.cron,
            "Initializing dependencies"
        );

        let mode = settings.opensearch.connection_mode;
        let retry_interval = settings.opensearch.retry_interval;

        let url = settings.opensearch.url.clone();
        let search_provider = connect_with_retry("OpenSearch", mode, retry_interval, || {
            OpenSearchProvider::new(&url)
        })
        .await?;
        info!("OpenSearch connection established");

        let index = Arc::new(IndexService::with_config(
            Box::new(search_provider),
            settings.opensearch.index.clone(),
        ));

        // Exits if the indices cannot be created
        index
            .ensure_indices()
            .await
            .map_err(|e| IndexingError::config(format!("Failed to ensure indices exist: {}", e)))?;

        let mongo = &settings.mongo;
        let store: Arc<dyn ContentStore> = Arc::new(
            connect_with_retry("MongoDB", mode, retry_interval, || {
                MongoContentStore::connect(&mongo.uri, &mongo.database)
            })
            .await?,
        );

        let consumer = KafkaConsumer::new(&settings.kafka).map_err(|e| {
            IndexingError::config(format!("Failed to create Kafka consumer: {}", e))
        })?;
        let dead_letters = KafkaDeadLetterProducer::new(&settings.kafka).map_err(|e| {
            IndexingError::config(format!("Failed to create dead-letter producer: {}", e))
        })?;
        info!("Kafka clients created");

        let handler = ContentChangeHandler::new(
            ChangeProcessor::new(store.clone()),
            IndexLoader::new(index.clone()),
        );

        let reconciler = Arc::new(Reconciler::new(store, index));
        let scheduler = SyncScheduler::new(reconciler, &settings.sync.cron, settings.sync.on_startup)
            .map_err(|e| IndexingError::config(e.to_string()))?;

        let config = OrchestratorConfig {
            workers: settings.consumer.workers,
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::with_config(
            Arc::new(consumer),
            Arc::new(handler),
            Arc::new(dead_letters),
            settings.consumer.retry.clone(),
            config,
        )
        .with_scheduler(scheduler);

        Ok(Self { orchestrator })
    }
}

/// Run `connect` until it succeeds, or once in fail-fast mode.
async fn connect_with_retry<T, E, F, Fut>(
    name: &str,
    mode: ConnectionMode,
    retry_interval: Duration,
    connect: F,
) -> Result<T, IndexingError>
where
    E: std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    loop {
        match connect().await {
            Ok(client) => return Ok(client),
            Err(e) => match mode {
                ConnectionMode::FailFast => {
                    return Err(IndexingError::config(format!(
                        "Failed to connect to {}: {}",
                        name, e
                    )));
                }
                ConnectionMode::Retry => {
                    warn!(
                        service = %name,
                        error = %e,
                        retry_interval_secs = retry_interval.as_secs(),
                        "Failed to connect, retrying..."
                    );
                    sleep(retry_interval).await;
                }
            },
        }
    }
}
