//! Bounded retry around the event handler, with dead-lettering once the
//! attempts run out.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use content_indexer_shared::ContentChangeEvent;
use tokio::sync::watch;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use tracing::{error, info, instrument, warn};

use crate::consumer::SourceMessage;
use crate::delivery::dead_letter::{DeadLetterRecord, DeadLetterSink};
use crate::delivery::stats::IngestStats;
use crate::errors::IngestError;
use crate::processor::EventHandler;

/// Exponential backoff between handler attempts.
///
/// With the defaults an event is tried at roughly 0s, 1s, 3s and 7s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(1000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// The waits between attempts: one fewer than `max_attempts`.
    ///
    /// `ExponentialBackoff` yields `factor * base^n` starting at `n = 1`, so
    /// the initial wait is prepended and the strategy supplies the growth.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let initial_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let growth =
            ExponentialBackoff::from_millis(u64::from(self.multiplier)).factor(initial_ms);

        std::iter::once(self.initial_backoff)
            .chain(growth)
            .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// The same backoff, never giving up: the last delay repeats forever.
    pub fn dead_letter_delays(&self) -> impl Iterator<Item = Duration> {
        let last = self.delays().last().unwrap_or(self.initial_backoff);
        self.delays().chain(std::iter::repeat(last))
    }
}

/// What happened to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The handler succeeded.
    Processed,
    /// The message could not be decoded into an event.
    Skipped,
    /// Retries ran out and the message was written to the dead-letter topic.
    DeadLettered,
    /// Shutdown began before the dead-letter record was accepted. The message
    /// is left uncommitted and will be redelivered.
    Abandoned,
}

impl DeliveryOutcome {
    /// Whether the message's offset may be committed.
    pub fn is_acknowledged(&self) -> bool {
        !matches!(self, DeliveryOutcome::Abandoned)
    }
}

/// Runs one message through decode, handler retries and dead-lettering.
pub struct Delivery {
    handler: Arc<dyn EventHandler>,
    dead_letters: Arc<dyn DeadLetterSink>,
    policy: RetryPolicy,
    stats: Arc<IngestStats>,
    shutdown: watch::Receiver<bool>,
}

impl Delivery {
    pub fn new(
        handler: Arc<dyn EventHandler>,
        dead_letters: Arc<dyn DeadLetterSink>,
        policy: RetryPolicy,
        stats: Arc<IngestStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            handler,
            dead_letters,
            policy,
            stats,
            shutdown,
        }
    }

    /// Deliver `message` to the handler.
    ///
    /// Handler retries are never cut short by shutdown; only the dead-letter
    /// publish loop gives up when shutdown begins.
    #[instrument(
        skip(self, message),
        fields(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            key = message.key_str().unwrap_or_default()
        )
    )]
    pub async fn deliver(&self, message: &SourceMessage) -> DeliveryOutcome {
        let Some(event) = decode(message) else {
            self.stats.record_skipped();
            return DeliveryOutcome::Skipped;
        };

        let attempts = AtomicU32::new(0);
        let result = {
            let handler = &self.handler;
            let event = &event;
            let attempts = &attempts;
            let max_attempts = self.policy.max_attempts;

            Retry::spawn(self.policy.delays(), move || async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                handler.handle(event).await.inspect_err(|e| {
                    warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        content_type = %event.content_type,
                        content_id = %event.content_id,
                        error = %e,
                        "Failed to handle change event"
                    );
                })
            })
            .await
        };

        match result {
            Ok(()) => {
                self.stats.record_processed();
                DeliveryOutcome::Processed
            }
            Err(e) => {
                let attempts = attempts.load(Ordering::SeqCst);
                error!(
                    attempts = attempts,
                    content_type = %event.content_type,
                    content_id = %event.content_id,
                    error = %e,
                    "Retries exhausted, dead-lettering change event"
                );
                self.dead_letter(message, &e, attempts).await
            }
        }
    }

    async fn dead_letter(
        &self,
        message: &SourceMessage,
        error: &IngestError,
        attempts: u32,
    ) -> DeliveryOutcome {
        let record = DeadLetterRecord::new(message, error.to_string(), attempts);
        let publish = {
            let sink = &self.dead_letters;
            let record = &record;
            Retry::spawn(self.policy.dead_letter_delays(), move || async move {
                sink.publish(record).await.inspect_err(|e| {
                    warn!(topic = %record.topic, error = %e, "Dead-letter publish failed, retrying");
                })
            })
        };

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            biased;
            result = publish => match result {
                Ok(()) => {
                    self.stats.record_dead_lettered();
                    info!(topic = %record.topic, attempts = attempts, "Change event dead-lettered");
                    DeliveryOutcome::DeadLettered
                }
                Err(e) => {
                    error!(topic = %record.topic, error = %e, "Gave up publishing dead-letter record");
                    DeliveryOutcome::Abandoned
                }
            },
            _ = shutdown.wait_for(|stop| *stop) => {
                warn!(
                    topic = %record.topic,
                    "Shutdown during dead-letter publish, leaving message uncommitted"
                );
                DeliveryOutcome::Abandoned
            }
        }
    }
}

/// Decode the change event carried by `message`. Messages that cannot be
/// decoded are logged and dropped.
fn decode(message: &SourceMessage) -> Option<ContentChangeEvent> {
    let Some(payload) = message.payload.as_deref() else {
        warn!("Skipping message without payload");
        return None;
    };

    match ContentChangeEvent::from_slice(payload) {
        Ok(event) if event.content_id.trim().is_empty() => {
            warn!(
                event_type = %event.event_type,
                content_type = %event.content_type,
                "Skipping change event without content id"
            );
            None
        }
        Ok(event) => Some(event),
        Err(e) => {
            warn!(
                error = %e,
                payload = %String::from_utf8_lossy(payload),
                "Skipping malformed change event"
            );
            None
        }
    }
}
