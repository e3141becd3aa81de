//! OpenSearch index settings and mappings.
//!
//! Both indices use a single shard and no replicas. Image and url fields are
//! stored but not indexed.

use content_indexer_shared::SearchIndex;
use serde_json::{json, Value};

const NUMBER_OF_SHARDS: u32 = 1;
const NUMBER_OF_REPLICAS: u32 = 0;

fn settings() -> Value {
    json!({
        "number_of_shards": NUMBER_OF_SHARDS,
        "number_of_replicas": NUMBER_OF_REPLICAS
    })
}

fn text_with_keyword() -> Value {
    json!({
        "type": "text",
        "analyzer": "standard",
        "fields": {
            "keyword": { "type": "keyword" }
        }
    })
}

fn text() -> Value {
    json!({ "type": "text", "analyzer": "standard" })
}

fn stored_keyword() -> Value {
    json!({ "type": "keyword", "index": false })
}

/// Settings and mappings for the cross-type `site_search` index.
pub fn site_search_index_body() -> Value {
    json!({
        "settings": settings(),
        "mappings": {
            "properties": {
                "name": text_with_keyword(),
                "type": { "type": "keyword" },
                "shortDescription": text(),
                "longDescription": text(),
                "image": stored_keyword(),
                "url": stored_keyword()
            }
        }
    })
}

/// Settings and mappings for the blog-only `blog_search` index.
pub fn blog_search_index_body() -> Value {
    json!({
        "settings": settings(),
        "mappings": {
            "properties": {
                "title": text_with_keyword(),
                "shortDescription": text(),
                "content": text(),
                "tags": { "type": "keyword" },
                "skills": { "type": "keyword" },
                "image": stored_keyword(),
                "publishedDate": {
                    "type": "date",
                    "format": "strict_date_optional_time"
                },
                "url": stored_keyword()
            }
        }
    })
}

/// The create-index request body for `index`.
pub fn index_body(index: SearchIndex) -> Value {
    match index {
        SearchIndex::Site => site_search_index_body(),
        SearchIndex::Blog => blog_search_index_body(),
    }
}
