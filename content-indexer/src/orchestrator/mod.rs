//! Orchestrator module for the content indexer ingest.
//!
//! Coordinates the consumer, the worker pool and the reconciliation scheduler.

use std::sync::Arc;

use rdkafka::consumer::CommitMode;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{Acknowledgment, MessageSource, OffsetTracker};
use crate::delivery::{DeadLetterSink, Delivery, IngestStats, RetryPolicy, StatsSnapshot, WorkerPool};
use crate::errors::IngestError;
use crate::processor::EventHandler;
use crate::reconciler::SyncScheduler;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Number of workers handling events.
    pub workers: usize,
    /// Size of each worker's queue.
    pub queue_capacity: usize,
    /// How often progress is logged.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 100,
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// Requests a graceful shutdown of a running orchestrator.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Polls the message source and dispatches messages to workers by key
/// - Commits offsets as acknowledgments arrive, never past an unfinished message
/// - Starts and stops the reconciliation scheduler
/// - Handles shutdown signals
/// - Logs progress
pub struct Orchestrator {
    source: Arc<dyn MessageSource>,
    handler: Arc<dyn EventHandler>,
    dead_letters: Arc<dyn DeadLetterSink>,
    retry: RetryPolicy,
    scheduler: Option<SyncScheduler>,
    config: OrchestratorConfig,
    stats: Arc<IngestStats>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        source: Arc<dyn MessageSource>,
        handler: Arc<dyn EventHandler>,
        dead_letters: Arc<dyn DeadLetterSink>,
        retry: RetryPolicy,
    ) -> Self {
        Self::with_config(source, handler, dead_letters, retry, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        source: Arc<dyn MessageSource>,
        handler: Arc<dyn EventHandler>,
        dead_letters: Arc<dyn DeadLetterSink>,
        retry: RetryPolicy,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            source,
            handler,
            dead_letters,
            retry,
            scheduler: None,
            config,
            stats: Arc::new(IngestStats::default()),
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Run reconciliation alongside the consumer.
    pub fn with_scheduler(mut self, scheduler: SyncScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        self.stats.clone()
    }

    /// Run the orchestrator.
    ///
    /// Blocks until a shutdown signal is received or dispatching fails. On the
    /// way out the workers finish the event in hand, the final offsets are
    /// committed synchronously and a running reconciliation pass completes.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!("Starting content indexer orchestrator");

        self.source.subscribe()?;
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.start().await?;
        }

        // Unbounded so a worker never blocks on an acknowledgment while the
        // loop below is blocked dispatching to that worker.
        let (ack_tx, mut ack_rx) = mpsc::unbounded_channel::<Acknowledgment>();

        let delivery = Arc::new(Delivery::new(
            self.handler.clone(),
            self.dead_letters.clone(),
            self.retry.clone(),
            self.stats.clone(),
            self.shutdown_tx.subscribe(),
        ));
        let pool = WorkerPool::spawn(
            self.config.workers,
            self.config.queue_capacity,
            delivery,
            ack_tx,
            self.shutdown_tx.subscribe(),
        );

        let mut offsets = OffsetTracker::new();
        let mut shutdown = self.shutdown_tx.subscribe();

        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut previous = self.stats.snapshot();
        let mut previous_time = Instant::now();

        info!(workers = pool.size(), "Ready to process events from Kafka");

        let result = loop {
            tokio::select! {
                _ = async { shutdown.wait_for(|stop| *stop).await.map(|_| ()) } => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break Ok(());
                }
                Some(ack) = ack_rx.recv() => {
                    self.acknowledge(&mut offsets, &ack);
                }
                message = self.source.recv() => match message {
                    Ok(message) => {
                        self.stats.record_received();
                        offsets.track(&message.topic, message.partition, message.offset);

                        tokio::select! {
                            dispatched = pool.dispatch(message) => {
                                if let Err(e) = dispatched {
                                    error!(error = %e, "Failed to dispatch message");
                                    break Err(e);
                                }
                            }
                            _ = shutdown.wait_for(|stop| *stop) => {
                                info!("Shutdown requested while dispatching");
                                break Ok(());
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Kafka error");
                    }
                },
                _ = progress_timer.tick() => {
                    let now = Instant::now();
                    let current = self.stats.snapshot();
                    log_progress(&previous, &current, now.duration_since(previous_time), offsets.in_flight());
                    previous = current;
                    previous_time = now;
                }
            }
        };

        self.shutdown_tx.send_replace(true);
        pool.join().await;

        // Workers are gone, so every acknowledgment they sent is queued.
        while let Some(ack) = ack_rx.recv().await {
            offsets.acknowledge(&ack.topic, ack.partition, ack.offset);
        }
        let final_offsets = offsets.committed_offsets();
        match self.source.commit(&final_offsets, CommitMode::Sync) {
            Ok(()) => self.stats.record_committed(final_offsets.len() as u64),
            Err(e) => error!(error = %e, "Failed to commit final offsets"),
        }

        if let Some(scheduler) = self.scheduler.as_mut() {
            if let Err(e) = scheduler.shutdown().await {
                warn!(error = %e, "Failed to stop reconciliation scheduler");
            }
        }

        let totals = self.stats.snapshot();
        info!(
            received = totals.received,
            processed = totals.processed,
            skipped = totals.skipped,
            dead_lettered = totals.dead_lettered,
            uncommitted = offsets.in_flight(),
            "Orchestrator shutdown complete"
        );
        result
    }

    /// Record a finished message and commit if its partition moved forward.
    fn acknowledge(&self, offsets: &mut OffsetTracker, ack: &Acknowledgment) {
        let Some(commit) = offsets.acknowledge(&ack.topic, ack.partition, ack.offset) else {
            debug!(partition = ack.partition, offset = ack.offset, "Commit held back by earlier offset");
            return;
        };

        match self.source.commit(std::slice::from_ref(&commit), CommitMode::Async) {
            Ok(()) => self.stats.record_committed(1),
            Err(e) => error!(
                topic = %commit.topic,
                partition = commit.partition,
                offset = commit.offset,
                error = %e,
                "Failed to commit offset"
            ),
        }
    }
}

fn log_progress(previous: &StatsSnapshot, current: &StatsSnapshot, elapsed: Duration, in_flight: usize) {
    let elapsed_secs = elapsed.as_secs_f64();
    let received_per_sec = if elapsed_secs > 0.0 {
        current.received.saturating_sub(previous.received) as f64 / elapsed_secs
    } else {
        0.0
    };

    info!(
        received = current.received,
        acknowledged = current.acknowledged(),
        processed = current.processed,
        skipped = current.skipped,
        dead_lettered = current.dead_lettered,
        in_flight = in_flight,
        received_per_sec = format!("{:.2}", received_per_sec),
        "Processing progress"
    );
}
