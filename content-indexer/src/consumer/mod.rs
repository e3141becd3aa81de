//! Consumer module for the content indexer ingest.
//!
//! Provides the Kafka consumer that receives content change events and the
//! bookkeeping that decides which offsets are safe to commit.

mod kafka_consumer;
mod messages;
mod offsets;

use async_trait::async_trait;
use rdkafka::consumer::CommitMode;

use crate::errors::IngestError;

pub use kafka_consumer::KafkaConsumer;
pub use messages::{Acknowledgment, CommitOffset, SourceMessage};
pub use offsets::OffsetTracker;

/// A source of change-event messages with manual offset commits.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Subscribe to the configured topics.
    fn subscribe(&self) -> Result<(), IngestError>;

    /// Wait for the next message.
    ///
    /// Must be cancel safe: the orchestrator polls it inside `select!`.
    async fn recv(&self) -> Result<SourceMessage, IngestError>;

    /// Commit the given positions. Each offset is the next one to read.
    fn commit(&self, offsets: &[CommitOffset], mode: CommitMode) -> Result<(), IngestError>;
}
