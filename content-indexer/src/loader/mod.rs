//! Loader module for the content indexer ingest.
//!
//! Applies index actions through the index service.

use std::sync::Arc;

use content_indexer_repository::IndexService;
use tracing::{debug, instrument};

use crate::errors::IngestError;
use crate::processor::IndexAction;

/// Writes index actions to the search indices.
pub struct IndexLoader {
    index: Arc<IndexService>,
}

impl IndexLoader {
    pub fn new(index: Arc<IndexService>) -> Self {
        Self { index }
    }

    /// Apply a single action. Any failed write fails the whole action so the
    /// event is retried.
    #[instrument(skip_all)]
    pub async fn apply(&self, action: IndexAction) -> Result<(), IngestError> {
        match action {
            IndexAction::IndexBlog(blog) => self.index.index_blog_content(&blog).await?,
            IndexAction::DeleteBlog(id) => self.index.delete_blog_content(&id).await?,
            IndexAction::IndexJob(job) => self.index.index_job_content(&job).await?,
            IndexAction::DeleteJob(id) => self.index.delete_job_content(&id).await?,
            IndexAction::IndexSkills { group_id, skills } => {
                debug!(group_id = %group_id, skill_count = skills.len(), "Indexing skills");
                for skill in &skills {
                    self.index.index_skill_content(skill, &group_id).await?;
                }
            }
            IndexAction::DeleteSkill(id) => self.index.delete_skill_content(&id).await?,
        }
        Ok(())
    }
}
