//! Result types for bulk search index operations.

use crate::errors::SearchIndexError;

/// Outcome of one item inside a bulk request.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document id the item addressed.
    pub document_id: String,
    /// Whether the item succeeded.
    pub success: bool,
    /// Error if the item failed.
    pub error: Option<SearchIndexError>,
}

impl BatchOperationResult {
    pub fn succeeded(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(document_id: impl Into<String>, error: SearchIndexError) -> Self {
        Self {
            document_id: document_id.into(),
            success: false,
            error: Some(error),
        }
    }
}

/// Aggregate outcome of a bulk operation.
///
/// Partial failures are reported here instead of failing the whole call, so
/// callers can log failed items and carry on.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of items sent.
    pub total: usize,
    /// Number of items that succeeded.
    pub succeeded: usize,
    /// Number of items that failed.
    pub failed: usize,
    /// Per-item results, in request order.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from per-item results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|result| result.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Fold another summary into this one.
    pub fn merge(&mut self, other: BatchOperationSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.results.extend(other.results);
    }

    /// Whether any item failed.
    pub fn has_errors(&self) -> bool {
        self.failed > 0
    }

    /// Ids of the items that failed.
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|result| !result.success)
            .map(|result| result.document_id.as_str())
    }
}
