//! Keyed worker pool.
//!
//! Each worker owns a bounded queue. Messages with the same key always land on
//! the same worker and are handled in publish order; messages for different
//! keys may be handled concurrently.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::consumer::{Acknowledgment, SourceMessage};
use crate::delivery::retry::Delivery;
use crate::errors::IngestError;

/// Pick the worker for a message: by key when present, otherwise by
/// partition.
pub fn route(key: Option<&[u8]>, partition: i32, workers: usize) -> usize {
    let workers = workers.max(1);
    match key {
        Some(key) => {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            (hasher.finish() % workers as u64) as usize
        }
        None => partition.unsigned_abs() as usize % workers,
    }
}

pub struct WorkerPool {
    senders: Vec<mpsc::Sender<SourceMessage>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` workers, each with a queue of `queue_capacity`
    /// messages.
    pub fn spawn(
        workers: usize,
        queue_capacity: usize,
        delivery: Arc<Delivery>,
        acks: mpsc::UnboundedSender<Acknowledgment>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let workers = workers.max(1);
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers {
            let (sender, queue) = mpsc::channel(queue_capacity.max(1));
            senders.push(sender);
            handles.push(tokio::spawn(run_worker(
                id,
                queue,
                delivery.clone(),
                acks.clone(),
                shutdown.clone(),
            )));
        }

        info!(workers = workers, queue_capacity = queue_capacity, "Started worker pool");
        Self { senders, handles }
    }

    pub fn size(&self) -> usize {
        self.senders.len()
    }

    /// Queue `message` on its worker, waiting while that worker's queue is
    /// full.
    pub async fn dispatch(&self, message: SourceMessage) -> Result<(), IngestError> {
        let worker = route(message.key.as_deref(), message.partition, self.senders.len());
        let sender = self
            .senders
            .get(worker)
            .ok_or_else(|| IngestError::channel(format!("No worker {}", worker)))?;

        sender
            .send(message)
            .await
            .map_err(|e| IngestError::channel(format!("Worker {} stopped: {}", worker, e)))
    }

    /// Close the queues and wait for every worker to exit.
    pub async fn join(self) {
        drop(self.senders);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed");
            }
        }
    }
}

async fn run_worker(
    id: usize,
    mut queue: mpsc::Receiver<SourceMessage>,
    delivery: Arc<Delivery>,
    acks: mpsc::UnboundedSender<Acknowledgment>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(worker = id, "Worker started");

    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => break,
            message = queue.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let outcome = delivery.deliver(&message).await;
        debug!(worker = id, offset = message.offset, outcome = ?outcome, "Delivered message");

        if outcome.is_acknowledged() && acks.send(Acknowledgment::from(&message)).is_err() {
            warn!(worker = id, "Acknowledgment channel closed");
            break;
        }
    }

    debug!(worker = id, unprocessed = queue.len(), "Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_worker() {
        let first = route(Some(b"b1"), 0, 4);
        for partition in 0..8 {
            assert_eq!(route(Some(b"b1"), partition, 4), first);
        }
    }

    #[test]
    fn test_keyless_routes_by_partition() {
        assert_eq!(route(None, 0, 4), 0);
        assert_eq!(route(None, 5, 4), 1);
        assert_eq!(route(None, 7, 1), 0);
    }

    #[test]
    fn test_route_stays_in_range() {
        for i in 0..100u32 {
            let key = format!("content-{}", i);
            assert!(route(Some(key.as_bytes()), 0, 3) < 3);
        }
        assert_eq!(route(Some(b"x"), 0, 0), 0);
    }
}
