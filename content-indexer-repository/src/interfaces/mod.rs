//! Interface definitions for the search index backend and the primary store.
//!
//! Both are traits so the services can be driven by in-memory mocks in tests.

mod content_store;
mod search_index_provider;

pub use content_store::ContentStore;
pub use search_index_provider::SearchIndexProvider;
