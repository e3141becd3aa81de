//! # Content Indexer
//!
//! Keeps the site's search indices in sync with the primary content store.
//! Content change events are consumed from Kafka and applied one by one; a
//! scheduled reconciliation pass rebuilds both indices and removes orphans.
//!
//! ## Architecture
//!
//! The indexer follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Receives change events from Kafka and tracks offsets
//! 2. **Delivery**: Routes events to workers, retries, dead-letters
//! 3. **Processor**: Resolves events against MongoDB into index actions
//! 4. **Loader**: Applies index actions to OpenSearch
//! 5. **Reconciler**: Full rebuild-and-diff on a cron schedule
//! 6. **Orchestrator**: Coordinates the ingest flow
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`consumer`]: Kafka consumer and offset bookkeeping
//! - [`delivery`]: Worker pool, retry and dead-letter handling
//! - [`processor`]: Resolves events into index actions
//! - [`loader`]: Writes index actions to the search indices
//! - [`reconciler`]: Scheduled full synchronisation
//! - [`orchestrator`]: Coordinates the ingest flow
//! - [`errors`]: Error types for the indexer

pub mod config;
pub mod consumer;
pub mod delivery;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod reconciler;

pub use config::{Dependencies, Settings};
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
