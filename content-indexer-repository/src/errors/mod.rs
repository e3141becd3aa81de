//! Error types for the content indexer repository.
//!
//! Search index failures and primary store failures are kept apart so callers
//! can tell which side of the sync broke.

mod content_store_error;
mod search_index_error;

pub use content_store_error::ContentStoreError;
pub use search_index_error::SearchIndexError;
