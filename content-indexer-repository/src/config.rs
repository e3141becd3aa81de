//! Configuration types for the IndexService.

/// Default maximum number of documents sent in one bulk request.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

/// Default cap on the number of ids returned when listing an index.
///
/// Matches the search engine's default result window.
pub const DEFAULT_MAX_LISTED_IDS: usize = 10_000;

/// Configuration for the IndexService.
///
/// Bulk inputs larger than `max_batch_size` are split into several requests
/// rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIndexServiceConfig {
    /// Maximum number of documents in a single bulk request.
    pub max_batch_size: usize,
    /// Maximum number of ids returned by an id listing.
    pub max_listed_ids: usize,
}

impl Default for SearchIndexServiceConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_listed_ids: DEFAULT_MAX_LISTED_IDS,
        }
    }
}

impl SearchIndexServiceConfig {
    /// Create a config with a custom batch size.
    ///
    /// A batch size of zero is treated as one.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            ..Self::default()
        }
    }

    /// Override the id listing cap.
    pub fn max_listed_ids(mut self, max_listed_ids: usize) -> Self {
        self.max_listed_ids = max_listed_ids;
        self
    }
}
