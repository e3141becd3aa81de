//! Cron-driven reconciliation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, warn};

use crate::errors::IngestError;
use crate::reconciler::full_sync::{ReconciliationReport, Reconciler};

/// Runs reconciliation passes one at a time.
///
/// A pass requested while another is running is skipped, not queued.
pub struct SyncRunner {
    reconciler: Arc<Reconciler>,
    running: Mutex<()>,
    stopped: AtomicBool,
}

impl SyncRunner {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            reconciler,
            running: Mutex::new(()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Run a pass unless one is already running or the runner was stopped.
    pub async fn run_once(&self, trigger: &str) -> Option<ReconciliationReport> {
        if self.stopped.load(Ordering::SeqCst) {
            debug!(trigger = %trigger, "Runner stopped, not reconciling");
            return None;
        }

        let Ok(_guard) = self.running.try_lock() else {
            warn!(trigger = %trigger, "Reconciliation still running, skipping this trigger");
            return None;
        };

        info!(trigger = %trigger, "Reconciliation triggered");
        Some(self.reconciler.reconcile().await)
    }

    /// Refuse further passes and wait for a running one to finish.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _guard = self.running.lock().await;
    }
}

/// Fires reconciliation on a cron schedule and, optionally, once at startup.
pub struct SyncScheduler {
    runner: Arc<SyncRunner>,
    cron: String,
    run_on_startup: bool,
    job: Option<Job>,
    scheduler: Option<JobScheduler>,
}

impl SyncScheduler {
    /// Build the scheduler. Fails if `cron` is not a valid six-field cron
    /// expression.
    pub fn new(
        reconciler: Arc<Reconciler>,
        cron: &str,
        run_on_startup: bool,
    ) -> Result<Self, IngestError> {
        let runner = Arc::new(SyncRunner::new(reconciler));
        let job = scheduled_job(cron, runner.clone())?;

        Ok(Self {
            runner,
            cron: cron.to_string(),
            run_on_startup,
            job: Some(job),
            scheduler: None,
        })
    }

    /// Start firing. The startup pass, if enabled, runs in the background.
    pub async fn start(&mut self) -> Result<(), IngestError> {
        let scheduler = JobScheduler::new().await?;
        if let Some(job) = self.job.take() {
            scheduler.add(job).await?;
        }
        scheduler.start().await?;
        self.scheduler = Some(scheduler);

        info!(cron = %self.cron, run_on_startup = self.run_on_startup, "Reconciliation scheduled");

        if self.run_on_startup {
            let runner = self.runner.clone();
            tokio::spawn(async move {
                runner.run_once("startup").await;
            });
        }
        Ok(())
    }

    /// Stop firing and wait for a running pass to complete.
    pub async fn shutdown(&mut self) -> Result<(), IngestError> {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.shutdown().await?;
        }
        self.runner.stop().await;

        info!("Reconciliation scheduler stopped");
        Ok(())
    }
}

fn scheduled_job(cron: &str, runner: Arc<SyncRunner>) -> Result<Job, IngestError> {
    Job::new_async(cron, move |_uuid, _lock| {
        let runner = runner.clone();
        Box::pin(async move {
            runner.run_once("schedule").await;
        })
    })
    .map_err(|e| IngestError::scheduler(format!("Invalid cron expression '{}': {}", cron, e)))
}
