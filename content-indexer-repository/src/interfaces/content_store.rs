//! Primary store read API.

use async_trait::async_trait;
use content_indexer_shared::{Blog, Job, SkillGroup};

use crate::errors::ContentStoreError;

/// Read-only view of the primary store.
///
/// Every method is side-effect free. Returned records have their references
/// resolved and their identifiers normalised to strings.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Find a blog post by id, only if it is published.
    async fn find_published_blog(&self, id: &str) -> Result<Option<Blog>, ContentStoreError>;

    /// Find a job by id.
    async fn find_job(&self, id: &str) -> Result<Option<Job>, ContentStoreError>;

    /// All skill groups, by display order ascending.
    async fn list_skill_groups(&self) -> Result<Vec<SkillGroup>, ContentStoreError>;

    /// All published blog posts, newest first.
    async fn list_published_blogs(&self) -> Result<Vec<Blog>, ContentStoreError>;

    /// All jobs, by start date descending.
    async fn list_jobs(&self) -> Result<Vec<Job>, ContentStoreError>;
}
