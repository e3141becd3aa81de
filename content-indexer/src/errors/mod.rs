//! Error types for the content indexer ingest.

use content_indexer_repository::{ContentStoreError, SearchIndexError};
use thiserror::Error;

/// Errors that can occur in the content indexer ingest.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Error from the search index.
    #[error("Search index error: {0}")]
    SearchIndexError(#[from] SearchIndexError),

    /// Error reading from the primary store.
    #[error("Content store error: {0}")]
    ContentStoreError(#[from] ContentStoreError),

    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Publishing to the dead-letter topic failed.
    #[error("Dead letter error: {0}")]
    DeadLetterError(String),

    /// The reconciliation scheduler failed.
    #[error("Scheduler error: {0}")]
    SchedulerError(String),
}

impl IngestError {
    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }

    /// Create a dead letter error.
    pub fn dead_letter(msg: impl Into<String>) -> Self {
        Self::DeadLetterError(msg.into())
    }

    /// Create a scheduler error.
    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::SchedulerError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for IngestError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        Self::SchedulerError(err.to_string())
    }
}
