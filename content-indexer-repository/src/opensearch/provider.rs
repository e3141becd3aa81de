//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use content_indexer_shared::{SearchIndex, SiteDocumentType};
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, DeleteParts, IndexParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::index_body;
use crate::types::{BatchOperationResult, BatchOperationSummary};

/// OpenSearch provider implementation.
///
/// Holds a single long-lived client shared by every caller.
///
/// # Example
///
/// ```ignore
/// let provider = OpenSearchProvider::new("http://localhost:9200").await?;
/// provider.ensure_index(SearchIndex::Site).await?;
/// provider
///     .index_document(SearchIndex::Site, "b1", &json!({ "name": "Spring Boot Tips" }))
///     .await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
}

impl OpenSearchProvider {
    /// Create a provider for the OpenSearch node at `url` and verify it answers.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A provider whose node responded to a ping
    /// * `Err(SearchIndexError)` - If the URL is invalid or the node is unreachable
    pub async fn new(url: &str) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        let response = client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchIndexError::connection(format!(
                "Ping failed with status {}",
                status
            )));
        }

        info!(url = %url, "Created OpenSearch provider");

        Ok(Self { client })
    }

    async fn index_exists(&self, index: SearchIndex) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index.name()]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchIndexError::index_creation(format!(
                "Unexpected status {} checking index {}",
                status, index
            ))),
        }
    }

    async fn send_bulk(
        &self,
        index: SearchIndex,
        action: BulkAction,
        body: Vec<JsonBody<Value>>,
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let response = self
            .client
            .bulk(BulkParts::Index(index.name()))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(index = %index, status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::bulk(format!(
                "Bulk {} failed with status {}: {}",
                action.name(),
                status,
                error_body
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        parse_bulk_response(action, &body)
    }

    /// Ids of up to `limit` documents in `index` matching `query`.
    async fn search_ids(
        &self,
        index: SearchIndex,
        query: Value,
        limit: usize,
    ) -> Result<Vec<String>, SearchIndexError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index.name()]))
            .body(json!({
                "size": limit,
                "_source": false,
                "query": query
            }))
            .send()
            .await
            .map_err(|e| SearchIndexError::search(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(index = %index, status = %status, body = %error_body, "Search request failed");
            return Err(SearchIndexError::search(format!(
                "Listing ids failed with status {}: {}",
                status, error_body
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        parse_hit_ids(&body)
    }
}

/// The bulk action whose response is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkAction {
    Index,
    Delete,
}

impl BulkAction {
    fn name(&self) -> &'static str {
        match self {
            BulkAction::Index => "index",
            BulkAction::Delete => "delete",
        }
    }
}

/// Turn a bulk response body into a per-item summary.
///
/// Delete items answering 404 count as successes.
fn parse_bulk_response(
    action: BulkAction,
    body: &Value,
) -> Result<BatchOperationSummary, SearchIndexError> {
    let items = body["items"]
        .as_array()
        .ok_or_else(|| SearchIndexError::parse("Bulk response has no items array"))?;

    let results = items
        .iter()
        .map(|item| {
            let op = &item[action.name()];
            let id = op["_id"].as_str().unwrap_or_default().to_string();
            let status = op["status"].as_u64().unwrap_or(0);
            let error = op.get("error").filter(|e| !e.is_null());

            let not_found = action == BulkAction::Delete && status == 404;
            match error {
                Some(_) if not_found => BatchOperationResult::succeeded(id),
                Some(error) => {
                    let reason = error["reason"]
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| error.to_string());
                    let error = match action {
                        BulkAction::Index => SearchIndexError::index(reason),
                        BulkAction::Delete => SearchIndexError::delete(reason),
                    };
                    BatchOperationResult::failed(id, error)
                }
                None if (200..300).contains(&status) || not_found => {
                    BatchOperationResult::succeeded(id)
                }
                None => {
                    let error = SearchIndexError::unknown(format!(
                        "{} returned status {}",
                        action.name(),
                        status
                    ));
                    BatchOperationResult::failed(id, error)
                }
            }
        })
        .collect();

    Ok(BatchOperationSummary::from_results(results))
}

/// Extract the `_id` of every hit in a search response.
fn parse_hit_ids(body: &Value) -> Result<Vec<String>, SearchIndexError> {
    let hits = body["hits"]["hits"]
        .as_array()
        .ok_or_else(|| SearchIndexError::parse("Search response has no hits array"))?;

    Ok(hits
        .iter()
        .filter_map(|hit| hit["_id"].as_str().map(str::to_string))
        .collect())
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Create the index with its mappings unless it already exists.
    ///
    /// Losing a creation race to another instance is treated as success.
    async fn ensure_index(&self, index: SearchIndex) -> Result<(), SearchIndexError> {
        if self.index_exists(index).await? {
            info!(index = %index, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index.name()))
            .body(index_body(index))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            if error_body.contains("resource_already_exists_exception") {
                info!(index = %index, "Index created concurrently");
                return Ok(());
            }
            error!(index = %index, status = %status, body = %error_body, "Index creation failed");
            return Err(SearchIndexError::index_creation(format!(
                "Creating {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        info!(index = %index, "Created index");
        Ok(())
    }

    async fn index_document(
        &self,
        index: SearchIndex,
        id: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .index(IndexParts::IndexId(index.name(), id))
            .body(document)
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(index = %index, id = %id, status = %status, body = %error_body, "Index request failed");
            return Err(SearchIndexError::index(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %index, id = %id, "Document indexed");
        Ok(())
    }

    async fn delete_document(&self, index: SearchIndex, id: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index.name(), id))
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(index = %index, id = %id, status = %status, body = %error_body, "Delete request failed");
            return Err(SearchIndexError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %index, id = %id, "Document deleted");
        Ok(())
    }

    async fn bulk_index_documents(
        &self,
        index: SearchIndex,
        documents: &[(String, Value)],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for (id, document) in documents {
            body.push(json!({ "index": { "_id": id } }).into());
            body.push(document.clone().into());
        }

        self.send_bulk(index, BulkAction::Index, body).await
    }

    async fn bulk_delete_documents(
        &self,
        index: SearchIndex,
        ids: &[String],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let body: Vec<JsonBody<Value>> = ids
            .iter()
            .map(|id| json!({ "delete": { "_id": id } }).into())
            .collect();

        self.send_bulk(index, BulkAction::Delete, body).await
    }

    async fn list_document_ids(
        &self,
        index: SearchIndex,
        limit: usize,
    ) -> Result<Vec<String>, SearchIndexError> {
        self.search_ids(index, json!({ "match_all": {} }), limit).await
    }

    async fn list_site_document_ids(
        &self,
        doc_type: SiteDocumentType,
        limit: usize,
    ) -> Result<Vec<String>, SearchIndexError> {
        self.search_ids(
            SearchIndex::Site,
            json!({ "term": { "type": doc_type.as_str() } }),
            limit,
        )
        .await
    }
}
