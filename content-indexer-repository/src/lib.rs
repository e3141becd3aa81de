//! # Content Indexer Repository
//!
//! This crate provides the storage edges of the content indexer: the
//! `IndexService` that writes search documents through a `SearchIndexProvider`
//! (with an OpenSearch implementation), and the `ContentStore` read API over
//! the primary store (with a MongoDB implementation).

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod mongo;
pub mod opensearch;
pub mod service;
pub mod types;

pub use config::SearchIndexServiceConfig;
pub use errors::{ContentStoreError, SearchIndexError};
pub use interfaces::{ContentStore, SearchIndexProvider};
pub use mongo::MongoContentStore;
pub use opensearch::OpenSearchProvider;
pub use service::IndexService;
pub use types::{BatchOperationResult, BatchOperationSummary};
