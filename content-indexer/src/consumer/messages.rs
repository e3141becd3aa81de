//! Message types for the consumer.

use rdkafka::message::{BorrowedMessage, Message};

/// A message detached from the consumer, owned so it can cross task
/// boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
}

impl SourceMessage {
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        key: Option<Vec<u8>>,
        payload: Option<Vec<u8>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key,
            payload,
        }
    }

    /// Key as text, for logging.
    pub fn key_str(&self) -> Option<&str> {
        self.key
            .as_deref()
            .and_then(|key| std::str::from_utf8(key).ok())
    }
}

impl From<&BorrowedMessage<'_>> for SourceMessage {
    fn from(msg: &BorrowedMessage<'_>) -> Self {
        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(<[u8]>::to_vec),
            payload: msg.payload().map(<[u8]>::to_vec),
        }
    }
}

/// Sent by a worker once a message needs no further work, either because it
/// was processed, skipped as malformed, or dead-lettered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgment {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl From<&SourceMessage> for Acknowledgment {
    fn from(msg: &SourceMessage) -> Self {
        Self {
            topic: msg.topic.clone(),
            partition: msg.partition,
            offset: msg.offset,
        }
    }
}

/// A committable position: `offset` is the next offset to consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}
