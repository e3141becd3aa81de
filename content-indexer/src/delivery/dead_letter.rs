//! Dead-letter publishing for events that exhausted their retries.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::info;

use crate::config::KafkaSettings;
use crate::consumer::SourceMessage;
use crate::errors::IngestError;

pub const HEADER_ORIGINAL_TOPIC: &str = "dlt-original-topic";
pub const HEADER_ORIGINAL_PARTITION: &str = "dlt-original-partition";
pub const HEADER_ORIGINAL_OFFSET: &str = "dlt-original-offset";
pub const HEADER_EXCEPTION_MESSAGE: &str = "dlt-exception-message";
pub const HEADER_ATTEMPTS: &str = "dlt-attempts";

/// How long the producer may queue a dead-letter record before failing it.
const PRODUCE_TIMEOUT: Duration = Duration::from_secs(5);

/// The dead-letter topic for `topic`.
pub fn dead_letter_topic(topic: &str) -> String {
    format!("{}.DLT", topic)
}

/// A failed message as written to the dead-letter topic: the original key
/// and payload, plus where it came from and why it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterRecord {
    pub topic: String,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub original_topic: String,
    pub original_partition: i32,
    pub original_offset: i64,
    pub error_message: String,
    pub attempts: u32,
}

impl DeadLetterRecord {
    pub fn new(message: &SourceMessage, error_message: impl Into<String>, attempts: u32) -> Self {
        Self {
            topic: dead_letter_topic(&message.topic),
            key: message.key.clone(),
            payload: message.payload.clone(),
            original_topic: message.topic.clone(),
            original_partition: message.partition,
            original_offset: message.offset,
            error_message: error_message.into(),
            attempts,
        }
    }

    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (HEADER_ORIGINAL_TOPIC, self.original_topic.clone()),
            (HEADER_ORIGINAL_PARTITION, self.original_partition.to_string()),
            (HEADER_ORIGINAL_OFFSET, self.original_offset.to_string()),
            (HEADER_EXCEPTION_MESSAGE, self.error_message.clone()),
            (HEADER_ATTEMPTS, self.attempts.to_string()),
        ]
    }
}

/// Destination for dead-letter records.
///
/// `publish` returns only once the record is durably accepted.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn publish(&self, record: &DeadLetterRecord) -> Result<(), IngestError>;
}

/// Publishes dead-letter records to Kafka.
pub struct KafkaDeadLetterProducer {
    producer: FutureProducer,
}

impl KafkaDeadLetterProducer {
    pub fn new(settings: &KafkaSettings) -> Result<Self, IngestError> {
        let producer: FutureProducer = settings
            .client_config()
            .set("client.id", "content-indexer-dlt")
            .set("compression.type", "zstd")
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()?;

        info!(
            brokers = %settings.broker,
            topic = %dead_letter_topic(&settings.topic),
            "Created dead-letter producer"
        );

        Ok(Self { producer })
    }
}

#[async_trait]
impl DeadLetterSink for KafkaDeadLetterProducer {
    async fn publish(&self, record: &DeadLetterRecord) -> Result<(), IngestError> {
        let headers = record
            .headers()
            .into_iter()
            .fold(OwnedHeaders::new(), |headers, (key, value)| {
                headers.insert(Header {
                    key,
                    value: Some(value.as_str()),
                })
            });

        let mut message = FutureRecord::<[u8], [u8]>::to(&record.topic).headers(headers);
        if let Some(key) = &record.key {
            message = message.key(key.as_slice());
        }
        if let Some(payload) = &record.payload {
            message = message.payload(payload.as_slice());
        }

        let (partition, offset) = self
            .producer
            .send(message, PRODUCE_TIMEOUT)
            .await
            .map_err(|(e, _)| IngestError::dead_letter(e.to_string()))?;

        info!(
            topic = %record.topic,
            partition = partition,
            offset = offset,
            original_offset = record.original_offset,
            "Published dead-letter record"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_keeps_original_message_and_coordinates() {
        let message = SourceMessage::new(
            "content-changes",
            2,
            41,
            Some(b"b1".to_vec()),
            Some(br#"{"eventType":"CREATED"}"#.to_vec()),
        );
        let record = DeadLetterRecord::new(&message, "Search index error: boom", 4);

        assert_eq!(record.topic, "content-changes.DLT");
        assert_eq!(record.key, message.key);
        assert_eq!(record.payload, message.payload);
        assert_eq!(
            record.headers(),
            vec![
                ("dlt-original-topic", "content-changes".to_string()),
                ("dlt-original-partition", "2".to_string()),
                ("dlt-original-offset", "41".to_string()),
                ("dlt-exception-message", "Search index error: boom".to_string()),
                ("dlt-attempts", "4".to_string()),
            ]
        );
    }
}
