//! Rebuild-and-diff synchronisation.
//!
//! Each pass upserts every eligible record from the primary store, then
//! deletes whatever the index holds beyond that set. The two indices are
//! synced concurrently and independently: a failure in one leaves the other
//! untouched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use content_indexer_repository::{BatchOperationSummary, ContentStore, IndexService};
use content_indexer_shared::{
    blog_to_blog_doc, blog_to_site_doc, job_to_site_doc, skill_to_site_doc, SearchDocument,
    SearchIndex, SiteSearchDocument,
};
use tokio::time::Instant;
use tracing::{error, info, instrument};

use crate::errors::IngestError;

/// Counts from syncing one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSyncReport {
    pub index: SearchIndex,
    /// Documents sent to the index.
    pub written: usize,
    /// Documents whose bulk item failed.
    pub failed: usize,
    /// Documents found in the index with no eligible source record.
    pub orphans: usize,
    /// Orphans that could not be deleted.
    pub orphan_delete_failures: usize,
    pub duration: Duration,
}

/// The outcome of one reconciliation pass, per index.
#[derive(Debug)]
pub struct ReconciliationReport {
    pub site: Result<IndexSyncReport, IngestError>,
    pub blog: Result<IndexSyncReport, IngestError>,
}

impl ReconciliationReport {
    /// Whether both indices synced without errors.
    pub fn is_success(&self) -> bool {
        [&self.site, &self.blog].iter().all(|result| {
            result
                .as_ref()
                .is_ok_and(|r| r.failed == 0 && r.orphan_delete_failures == 0)
        })
    }
}

pub struct Reconciler {
    store: Arc<dyn ContentStore>,
    index: Arc<IndexService>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ContentStore>, index: Arc<IndexService>) -> Self {
        Self { store, index }
    }

    /// Run one pass over both indices.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> ReconciliationReport {
        info!("Starting reconciliation");
        let (site, blog) = tokio::join!(self.sync_site_index(), self.sync_blog_index());

        for result in [&site, &blog] {
            match result {
                Ok(report) => info!(
                    index = %report.index,
                    written = report.written,
                    failed = report.failed,
                    orphans = report.orphans,
                    orphan_delete_failures = report.orphan_delete_failures,
                    duration_ms = report.duration.as_millis() as u64,
                    "Index reconciled"
                ),
                Err(e) => error!(error = %e, "Index reconciliation failed, will retry next run"),
            }
        }

        ReconciliationReport { site, blog }
    }

    /// Sync `site_search` with published blogs, jobs and skills.
    pub async fn sync_site_index(&self) -> Result<IndexSyncReport, IngestError> {
        let started = Instant::now();

        let blogs = self.store.list_published_blogs().await?;
        let jobs = self.store.list_jobs().await?;
        let groups = self.store.list_skill_groups().await?;

        let documents: Vec<SiteSearchDocument> = blogs
            .iter()
            .map(blog_to_site_doc)
            .chain(jobs.iter().map(job_to_site_doc))
            .chain(groups.iter().flat_map(|group| {
                group
                    .skills
                    .iter()
                    .map(|skill| skill_to_site_doc(skill, &group.id))
            }))
            .collect();

        self.sync_index(&documents, started).await
    }

    /// Sync `blog_search` with published blogs.
    pub async fn sync_blog_index(&self) -> Result<IndexSyncReport, IngestError> {
        let started = Instant::now();

        let blogs = self.store.list_published_blogs().await?;
        let documents: Vec<_> = blogs.iter().map(blog_to_blog_doc).collect();

        self.sync_index(&documents, started).await
    }

    /// Write `documents` and delete everything else in the index.
    ///
    /// Every source id counts as live even if its bulk item failed, so a
    /// failed write never turns into a delete.
    ///
    /// A document the change consumer indexes after the store was read but
    /// before the ids are listed is not in `documents` and gets swept. It
    /// stays missing until its next change event or the next pass.
    async fn sync_index<D: SearchDocument + Sync>(
        &self,
        documents: &[D],
        started: Instant,
    ) -> Result<IndexSyncReport, IngestError> {
        let index = D::INDEX;
        let written: HashSet<&str> = documents.iter().map(SearchDocument::document_id).collect();
        let upserted = self.index.bulk_upsert(documents).await?;

        let mut orphans: Vec<String> = self
            .index
            .list_all_document_ids(index)
            .await?
            .into_iter()
            .filter(|id| !written.contains(id.as_str()))
            .collect();
        orphans.sort();

        let deleted = if orphans.is_empty() {
            BatchOperationSummary::default()
        } else {
            info!(index = %index, orphans = ?orphans, "Removing orphan documents");
            self.index.bulk_delete(index, &orphans).await?
        };

        Ok(IndexSyncReport {
            index,
            written: documents.len(),
            failed: upserted.failed,
            orphans: orphans.len(),
            orphan_delete_failures: deleted.failed,
            duration: started.elapsed(),
        })
    }
}
