//! Search index provider trait definition.

use async_trait::async_trait;
use content_indexer_shared::{SearchIndex, SiteDocumentType};
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::BatchOperationSummary;

/// Abstracts the underlying search engine (OpenSearch, Elasticsearch, etc.).
///
/// Providers work on already-serialized JSON documents and know nothing about
/// content types. Batching, empty-input short circuits and typed documents are
/// handled one level up in `IndexService`.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Create the index with its mappings if it does not exist yet.
    ///
    /// Calling this for an index that already exists is a no-op.
    async fn ensure_index(&self, index: SearchIndex) -> Result<(), SearchIndexError>;

    /// Store `document` under `id`, replacing any previous version wholesale.
    async fn index_document(
        &self,
        index: SearchIndex,
        id: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError>;

    /// Delete the document with `id`. A missing document is not an error.
    async fn delete_document(&self, index: SearchIndex, id: &str) -> Result<(), SearchIndexError>;

    /// Store several documents in a single request.
    ///
    /// Per-item failures are reported in the summary. `Err` means the request
    /// as a whole failed.
    async fn bulk_index_documents(
        &self,
        index: SearchIndex,
        documents: &[(String, Value)],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Delete several documents in a single request. Missing documents count
    /// as successful deletions.
    async fn bulk_delete_documents(
        &self,
        index: SearchIndex,
        ids: &[String],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Return up to `limit` document ids stored in the index.
    async fn list_document_ids(
        &self,
        index: SearchIndex,
        limit: usize,
    ) -> Result<Vec<String>, SearchIndexError>;

    /// Return up to `limit` ids of `site_search` documents whose `type` is
    /// `doc_type`.
    async fn list_site_document_ids(
        &self,
        doc_type: SiteDocumentType,
        limit: usize,
    ) -> Result<Vec<String>, SearchIndexError>;
}
