//! OpenSearch implementation of the search index provider.

mod index_config;
mod provider;

pub use index_config::{blog_search_index_body, index_body, site_search_index_body};
pub use provider::OpenSearchProvider;
