//! Delivery of change events to the handler.
//!
//! A message is routed to a worker by key, decoded, handled with bounded
//! retries, and dead-lettered once retries are exhausted. Only then is it
//! acknowledged back to the consumer for committing.

mod dead_letter;
mod retry;
mod stats;
mod worker_pool;

pub use dead_letter::{
    dead_letter_topic, DeadLetterRecord, DeadLetterSink, KafkaDeadLetterProducer,
    HEADER_ATTEMPTS, HEADER_EXCEPTION_MESSAGE, HEADER_ORIGINAL_OFFSET, HEADER_ORIGINAL_PARTITION,
    HEADER_ORIGINAL_TOPIC,
};
pub use retry::{Delivery, DeliveryOutcome, RetryPolicy};
pub use stats::{IngestStats, StatsSnapshot};
pub use worker_pool::{route, WorkerPool};
