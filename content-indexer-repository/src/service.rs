//! Index writer service.
//!
//! `IndexService` is the only component that writes to the search engine. It
//! serializes typed documents, splits bulk inputs into bounded batches, and
//! exposes the per-content-type operations used by both the change consumer
//! and the reconciliation pass.

use std::collections::HashSet;

use content_indexer_shared::{
    blog_to_blog_doc, blog_to_site_doc, is_skill_document_of, job_to_site_doc, skill_to_site_doc,
    Blog, Job, SearchDocument, SearchIndex, SiteDocumentType, Skill,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::SearchIndexServiceConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::BatchOperationSummary;

/// The main service for writing to the search indices.
///
/// Delegates the backend calls to a `SearchIndexProvider`.
///
/// # Example
///
/// ```no_run
/// use content_indexer_repository::{IndexService, OpenSearchProvider};
/// use content_indexer_shared::Blog;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Box::new(OpenSearchProvider::new("http://localhost:9200").await?);
/// let service = IndexService::new(provider);
///
/// service.ensure_indices().await?;
///
/// let blog = Blog {
///     id: "b1".to_string(),
///     title: "Spring Boot Tips".to_string(),
///     published: true,
///     ..Default::default()
/// };
/// // Writes the blog to both site_search and blog_search
/// service.index_blog_content(&blog).await?;
/// # Ok(())
/// # }
/// ```
pub struct IndexService {
    provider: Box<dyn SearchIndexProvider>,
    config: SearchIndexServiceConfig,
}

impl IndexService {
    /// Create a new IndexService with default configuration.
    pub fn new(provider: Box<dyn SearchIndexProvider>) -> Self {
        Self {
            provider,
            config: SearchIndexServiceConfig::default(),
        }
    }

    /// Create a new IndexService with custom configuration.
    pub fn with_config(
        provider: Box<dyn SearchIndexProvider>,
        config: SearchIndexServiceConfig,
    ) -> Self {
        Self { provider, config }
    }

    /// Create every index that does not exist yet.
    pub async fn ensure_indices(&self) -> Result<(), SearchIndexError> {
        for index in SearchIndex::ALL {
            self.provider.ensure_index(index).await?;
        }
        Ok(())
    }

    /// Store a document, replacing any previous version.
    pub async fn upsert<D: SearchDocument>(&self, document: &D) -> Result<(), SearchIndexError> {
        let value = serde_json::to_value(document)?;
        self.provider
            .index_document(D::INDEX, document.document_id(), &value)
            .await
    }

    /// Delete a document. Deleting a missing document succeeds.
    pub async fn delete(&self, index: SearchIndex, id: &str) -> Result<(), SearchIndexError> {
        self.provider.delete_document(index, id).await
    }

    /// Store many documents, `max_batch_size` per request.
    ///
    /// An empty input makes no request. Item failures are logged and reported
    /// in the summary; a request that fails outright aborts the remaining
    /// batches.
    pub async fn bulk_upsert<D: SearchDocument>(
        &self,
        documents: &[D],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut summary = BatchOperationSummary::default();
        if documents.is_empty() {
            return Ok(summary);
        }

        let index = D::INDEX;
        for chunk in documents.chunks(self.config.max_batch_size.max(1)) {
            let payload = chunk
                .iter()
                .map(|document| {
                    serde_json::to_value(document)
                        .map(|value| (document.document_id().to_string(), value))
                })
                .collect::<Result<Vec<(String, Value)>, _>>()?;

            let batch = self.provider.bulk_index_documents(index, &payload).await?;
            log_failures(index, "index", &batch);
            summary.merge(batch);
        }

        debug!(
            index = %index,
            total = summary.total,
            failed = summary.failed,
            "Bulk upsert finished"
        );
        Ok(summary)
    }

    /// Delete many documents, `max_batch_size` per request.
    ///
    /// Same empty-input and failure rules as [`IndexService::bulk_upsert`].
    pub async fn bulk_delete(
        &self,
        index: SearchIndex,
        ids: &[String],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut summary = BatchOperationSummary::default();
        if ids.is_empty() {
            return Ok(summary);
        }

        for chunk in ids.chunks(self.config.max_batch_size.max(1)) {
            let batch = self.provider.bulk_delete_documents(index, chunk).await?;
            log_failures(index, "delete", &batch);
            summary.merge(batch);
        }

        debug!(
            index = %index,
            total = summary.total,
            failed = summary.failed,
            "Bulk delete finished"
        );
        Ok(summary)
    }

    /// Every document id in `index`, up to `max_listed_ids`.
    ///
    /// Hitting the cap is logged, since ids past it are invisible to the
    /// orphan sweep.
    pub async fn list_all_document_ids(
        &self,
        index: SearchIndex,
    ) -> Result<HashSet<String>, SearchIndexError> {
        let limit = self.config.max_listed_ids;
        let ids = self.provider.list_document_ids(index, limit).await?;
        warn_if_capped(index, ids.len(), limit);
        Ok(ids.into_iter().collect())
    }

    /// Ids of the `site_search` documents of one type, up to `max_listed_ids`.
    pub async fn list_site_document_ids(
        &self,
        doc_type: SiteDocumentType,
    ) -> Result<HashSet<String>, SearchIndexError> {
        let limit = self.config.max_listed_ids;
        let ids = self.provider.list_site_document_ids(doc_type, limit).await?;
        warn_if_capped(SearchIndex::Site, ids.len(), limit);
        Ok(ids.into_iter().collect())
    }

    /// Write a blog post to both indices.
    pub async fn index_blog_content(&self, blog: &Blog) -> Result<(), SearchIndexError> {
        self.upsert(&blog_to_site_doc(blog)).await?;
        self.upsert(&blog_to_blog_doc(blog)).await?;
        info!(blog_id = %blog.id, "Indexed blog");
        Ok(())
    }

    /// Remove a blog post from both indices.
    pub async fn delete_blog_content(&self, blog_id: &str) -> Result<(), SearchIndexError> {
        self.delete(SearchIndex::Site, blog_id).await?;
        self.delete(SearchIndex::Blog, blog_id).await?;
        info!(blog_id = %blog_id, "Removed blog from indices");
        Ok(())
    }

    pub async fn index_job_content(&self, job: &Job) -> Result<(), SearchIndexError> {
        self.upsert(&job_to_site_doc(job)).await?;
        info!(job_id = %job.id, "Indexed job");
        Ok(())
    }

    pub async fn delete_job_content(&self, job_id: &str) -> Result<(), SearchIndexError> {
        self.delete(SearchIndex::Site, job_id).await?;
        info!(job_id = %job_id, "Removed job from index");
        Ok(())
    }

    pub async fn index_skill_content(
        &self,
        skill: &Skill,
        group_id: &str,
    ) -> Result<(), SearchIndexError> {
        self.upsert(&skill_to_site_doc(skill, group_id)).await?;
        info!(skill_id = %skill.id, group_id = %group_id, "Indexed skill");
        Ok(())
    }

    /// Remove skill documents for `content_id`.
    ///
    /// Skill documents are keyed `{group_id}_{skill_id}`, so besides the exact
    /// id this removes every skill document whose group or skill half equals
    /// `content_id`. Only documents of type `skill` are considered, so blogs
    /// and jobs whose ids share a half with `content_id` are left alone.
    pub async fn delete_skill_content(&self, content_id: &str) -> Result<(), SearchIndexError> {
        self.delete(SearchIndex::Site, content_id).await?;

        let mut composite: Vec<String> = self
            .list_site_document_ids(SiteDocumentType::Skill)
            .await?
            .into_iter()
            .filter(|id| id != content_id && is_skill_document_of(id, content_id))
            .collect();
        composite.sort();

        if !composite.is_empty() {
            let summary = self.bulk_delete(SearchIndex::Site, &composite).await?;
            if summary.has_errors() {
                return Err(SearchIndexError::delete(format!(
                    "{} of {} skill documents for {} could not be deleted",
                    summary.failed, summary.total, content_id
                )));
            }
        }

        info!(
            content_id = %content_id,
            composite_deleted = composite.len(),
            "Removed skill documents from index"
        );
        Ok(())
    }
}

fn warn_if_capped(index: SearchIndex, listed: usize, limit: usize) {
    if listed >= limit {
        warn!(
            index = %index,
            limit = limit,
            "Document id listing hit its cap; documents beyond it are not checked for orphans"
        );
    }
}

fn log_failures(index: SearchIndex, action: &str, summary: &BatchOperationSummary) {
    if !summary.has_errors() {
        return;
    }
    for result in summary.results.iter().filter(|result| !result.success) {
        error!(
            index = %index,
            action = action,
            document_id = %result.document_id,
            error = ?result.error,
            "Bulk item failed"
        );
    }
    error!(
        index = %index,
        action = action,
        errors = true,
        failed = summary.failed,
        total = summary.total,
        "Bulk request had errors"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BatchOperationResult;
    use async_trait::async_trait;
    use content_indexer_shared::{SiteDocumentType, SiteSearchDocument};
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// Records every call; stores documents per index.
    #[derive(Default)]
    struct MockState {
        calls: Vec<String>,
        docs: BTreeMap<(&'static str, String), Value>,
        fail_ids: HashSet<String>,
    }

    #[derive(Clone, Default)]
    struct MockProvider {
        state: Arc<Mutex<MockState>>,
    }

    impl MockProvider {
        fn seed(&self, index: SearchIndex, id: &str) {
            self.state
                .lock()
                .unwrap()
                .docs
                .insert((index.name(), id.to_string()), Value::Null);
        }

        fn seed_site(&self, id: &str, doc_type: SiteDocumentType) {
            self.state.lock().unwrap().docs.insert(
                (SearchIndex::Site.name(), id.to_string()),
                serde_json::json!({ "id": id, "type": doc_type.as_str() }),
            );
        }

        fn ids(&self, index: SearchIndex) -> Vec<String> {
            self.state
                .lock()
                .unwrap()
                .docs
                .keys()
                .filter(|(name, _)| *name == index.name())
                .map(|(_, id)| id.clone())
                .collect()
        }

        fn calls(&self) -> Vec<String> {
            self.state.lock().unwrap().calls.clone()
        }
    }

    #[async_trait]
    impl SearchIndexProvider for MockProvider {
        async fn ensure_index(&self, index: SearchIndex) -> Result<(), SearchIndexError> {
            self.state
                .lock()
                .unwrap()
                .calls
                .push(format!("ensure:{}", index));
            Ok(())
        }

        async fn index_document(
            &self,
            index: SearchIndex,
            id: &str,
            document: &Value,
        ) -> Result<(), SearchIndexError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("index:{}:{}", index, id));
            state
                .docs
                .insert((index.name(), id.to_string()), document.clone());
            Ok(())
        }

        async fn delete_document(
            &self,
            index: SearchIndex,
            id: &str,
        ) -> Result<(), SearchIndexError> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("delete:{}:{}", index, id));
            state.docs.remove(&(index.name(), id.to_string()));
            Ok(())
        }

        async fn bulk_index_documents(
            &self,
            index: SearchIndex,
            documents: &[(String, Value)],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(format!("bulk_index:{}:{}", index, documents.len()));
            let mut results = Vec::new();
            for (id, document) in documents {
                if state.fail_ids.contains(id) {
                    results.push(BatchOperationResult::failed(
                        id.clone(),
                        SearchIndexError::index("rejected"),
                    ));
                } else {
                    state
                        .docs
                        .insert((index.name(), id.clone()), document.clone());
                    results.push(BatchOperationResult::succeeded(id.clone()));
                }
            }
            Ok(BatchOperationSummary::from_results(results))
        }

        async fn bulk_delete_documents(
            &self,
            index: SearchIndex,
            ids: &[String],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(format!("bulk_delete:{}:{}", index, ids.len()));
            for id in ids {
                state.docs.remove(&(index.name(), id.clone()));
            }
            Ok(BatchOperationSummary::from_results(
                ids.iter().map(BatchOperationResult::succeeded).collect(),
            ))
        }

        async fn list_document_ids(
            &self,
            index: SearchIndex,
            limit: usize,
        ) -> Result<Vec<String>, SearchIndexError> {
            Ok(self.ids(index).into_iter().take(limit).collect())
        }

        async fn list_site_document_ids(
            &self,
            doc_type: SiteDocumentType,
            limit: usize,
        ) -> Result<Vec<String>, SearchIndexError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .docs
                .iter()
                .filter(|((name, _), doc)| {
                    *name == SearchIndex::Site.name() && doc["type"] == doc_type.as_str()
                })
                .map(|((_, id), _)| id.clone())
                .take(limit)
                .collect())
        }
    }

    fn site_doc(id: &str) -> SiteSearchDocument {
        SiteSearchDocument {
            id: id.to_string(),
            name: format!("Doc {}", id),
            doc_type: SiteDocumentType::Job,
            short_description: None,
            long_description: None,
            image: None,
            url: "/employment".to_string(),
        }
    }

    #[tokio::test]
    async fn test_bulk_upsert_empty_makes_no_calls() {
        let provider = MockProvider::default();
        let service = IndexService::new(Box::new(provider.clone()));

        let summary = service
            .bulk_upsert::<SiteSearchDocument>(&[])
            .await
            .unwrap();

        assert_eq!(summary.total, 0);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_delete_empty_makes_no_calls() {
        let provider = MockProvider::default();
        let service = IndexService::new(Box::new(provider.clone()));

        let summary = service.bulk_delete(SearchIndex::Site, &[]).await.unwrap();

        assert_eq!(summary.total, 0);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_upsert_splits_batches() {
        let provider = MockProvider::default();
        let service = IndexService::with_config(
            Box::new(provider.clone()),
            SearchIndexServiceConfig::with_max_batch_size(2),
        );

        let documents: Vec<_> = (0..5).map(|i| site_doc(&format!("j{}", i))).collect();
        let summary = service.bulk_upsert(&documents).await.unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.succeeded, 5);
        assert_eq!(
            provider.calls(),
            vec![
                "bulk_index:site_search:2",
                "bulk_index:site_search:2",
                "bulk_index:site_search:1"
            ]
        );
    }

    #[tokio::test]
    async fn test_bulk_upsert_reports_partial_failure() {
        let provider = MockProvider::default();
        provider
            .state
            .lock()
            .unwrap()
            .fail_ids
            .insert("j1".to_string());
        let service = IndexService::new(Box::new(provider.clone()));

        let summary = service
            .bulk_upsert(&[site_doc("j0"), site_doc("j1"), site_doc("j2")])
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(provider.ids(SearchIndex::Site), vec!["j0", "j2"]);
    }

    #[tokio::test]
    async fn test_list_all_document_ids_respects_cap() {
        let provider = MockProvider::default();
        for i in 0..5 {
            provider.seed(SearchIndex::Site, &format!("d{}", i));
        }
        let service = IndexService::with_config(
            Box::new(provider.clone()),
            SearchIndexServiceConfig::default().max_listed_ids(3),
        );

        let ids = service
            .list_all_document_ids(SearchIndex::Site)
            .await
            .unwrap();

        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_blog_content_touches_both_indices() {
        let provider = MockProvider::default();
        let service = IndexService::new(Box::new(provider.clone()));
        let blog = Blog {
            id: "b1".to_string(),
            title: "Spring Boot Tips".to_string(),
            published: true,
            ..Default::default()
        };

        service.index_blog_content(&blog).await.unwrap();
        assert_eq!(provider.ids(SearchIndex::Site), vec!["b1"]);
        assert_eq!(provider.ids(SearchIndex::Blog), vec!["b1"]);

        service.delete_blog_content("b1").await.unwrap();
        assert!(provider.ids(SearchIndex::Site).is_empty());
        assert!(provider.ids(SearchIndex::Blog).is_empty());
    }

    #[tokio::test]
    async fn test_job_content_only_touches_site_index() {
        let provider = MockProvider::default();
        let service = IndexService::new(Box::new(provider.clone()));
        let job = Job {
            id: "j1".to_string(),
            title: "Engineer".to_string(),
            ..Default::default()
        };

        service.index_job_content(&job).await.unwrap();

        assert_eq!(provider.ids(SearchIndex::Site), vec!["j1"]);
        assert!(provider.ids(SearchIndex::Blog).is_empty());
    }

    #[tokio::test]
    async fn test_delete_skill_content_removes_composite_ids() {
        let provider = MockProvider::default();
        provider.seed_site("g1_s1", SiteDocumentType::Skill);
        provider.seed_site("g1_s2", SiteDocumentType::Skill);
        provider.seed_site("g2_s3", SiteDocumentType::Skill);
        provider.seed_site("b1", SiteDocumentType::Blog);
        let service = IndexService::new(Box::new(provider.clone()));

        service.delete_skill_content("g1").await.unwrap();
        assert_eq!(provider.ids(SearchIndex::Site), vec!["b1", "g2_s3"]);

        service.delete_skill_content("s3").await.unwrap();
        assert_eq!(provider.ids(SearchIndex::Site), vec!["b1"]);
    }

    #[tokio::test]
    async fn test_delete_skill_content_with_underscored_ids() {
        let provider = MockProvider::default();
        // skill "rust" in group "web_dev"
        provider.seed_site("web_dev_rust", SiteDocumentType::Skill);
        provider.seed_site("acme_2020", SiteDocumentType::Job);
        provider.seed_site("spring_tips", SiteDocumentType::Blog);
        let service = IndexService::new(Box::new(provider.clone()));

        service.delete_skill_content("acme").await.unwrap();
        service.delete_skill_content("tips").await.unwrap();
        assert_eq!(
            provider.ids(SearchIndex::Site),
            vec!["acme_2020", "spring_tips", "web_dev_rust"]
        );

        service.delete_skill_content("rust").await.unwrap();
        assert_eq!(provider.ids(SearchIndex::Site), vec!["acme_2020", "spring_tips"]);
    }

    #[tokio::test]
    async fn test_ensure_indices_creates_both() {
        let provider = MockProvider::default();
        let service = IndexService::new(Box::new(provider.clone()));

        service.ensure_indices().await.unwrap();

        assert_eq!(
            provider.calls(),
            vec!["ensure:site_search", "ensure:blog_search"]
        );
    }

    #[tokio::test]
    async fn test_reindexing_is_byte_identical() {
        let provider = MockProvider::default();
        let service = IndexService::new(Box::new(provider.clone()));
        let blog = Blog {
            id: "b1".to_string(),
            title: "Spring Boot Tips".to_string(),
            published: true,
            ..Default::default()
        };

        service.index_blog_content(&blog).await.unwrap();
        let first = provider.state.lock().unwrap().docs.clone();
        service.index_blog_content(&blog).await.unwrap();
        let second = provider.state.lock().unwrap().docs.clone();

        assert_eq!(first, second);
        let site = &first[&("site_search", "b1".to_string())];
        assert_eq!(site["type"], "blog");
        assert_eq!(site["url"], "/blogs/b1");
    }
}
