//! Kafka consumer implementation for the content indexer.

use async_trait::async_trait;
use rdkafka::{
    consumer::{CommitMode, Consumer, StreamConsumer},
    Offset, TopicPartitionList,
};
use tracing::{debug, info};

use crate::config::KafkaSettings;
use crate::consumer::messages::{CommitOffset, SourceMessage};
use crate::consumer::MessageSource;
use crate::errors::IngestError;

/// Kafka consumer for content change events.
///
/// Auto commit is disabled; offsets are committed explicitly once the
/// messages before them have been handled.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// # Arguments
    ///
    /// * `settings` - Broker address, consumer group, topic and credentials
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(IngestError)` - If consumer creation fails
    pub fn new(settings: &KafkaSettings) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = settings
            .client_config()
            .set("group.id", &settings.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()?;

        info!(
            brokers = %settings.broker,
            group_id = %settings.group_id,
            topic = %settings.topic,
            sasl = settings.sasl_enabled(),
            "Created Kafka consumer"
        );

        Ok(Self {
            consumer,
            topics: vec![settings.topic.clone()],
        })
    }
}

#[async_trait]
impl MessageSource for KafkaConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();
        self.consumer.subscribe(&topics)?;

        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    async fn recv(&self) -> Result<SourceMessage, IngestError> {
        let msg = self.consumer.recv().await?;
        let message = SourceMessage::from(&msg);

        debug!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            "Received message from Kafka"
        );
        Ok(message)
    }

    fn commit(&self, offsets: &[CommitOffset], mode: CommitMode) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for commit in offsets {
            tpl.add_partition_offset(&commit.topic, commit.partition, Offset::Offset(commit.offset))?;
        }

        self.consumer.commit(&tpl, mode)?;
        debug!(offset_count = offsets.len(), mode = ?mode, "Committed offsets");
        Ok(())
    }
}
