//! Search document types.
//!
//! This module defines the two document shapes stored in the search engine:
//! the cross-type `site_search` projection and the blog-only `blog_search`
//! projection.
//!
//! Documents carry no indexing-time metadata. Re-transforming identical source
//! state must produce byte-identical JSON, so every field is derived from the
//! source record and optional fields are omitted rather than written as `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the cross-type index.
pub const SITE_SEARCH_INDEX: &str = "site_search";

/// Name of the blog-only index.
pub const BLOG_SEARCH_INDEX: &str = "blog_search";

/// The search indices maintained by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchIndex {
    /// One normalized document per blog, job and skill.
    Site,
    /// Full-text blog bodies.
    Blog,
}

impl SearchIndex {
    /// Every index, in sync order.
    pub const ALL: [SearchIndex; 2] = [SearchIndex::Site, SearchIndex::Blog];

    /// The index name in the search engine.
    pub fn name(&self) -> &'static str {
        match self {
            SearchIndex::Site => SITE_SEARCH_INDEX,
            SearchIndex::Blog => BLOG_SEARCH_INDEX,
        }
    }
}

impl std::fmt::Display for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The `type` discriminator of a [`SiteSearchDocument`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SiteDocumentType {
    Blog,
    Job,
    Skill,
}

impl SiteDocumentType {
    /// The value stored in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteDocumentType::Blog => "blog",
            SiteDocumentType::Job => "job",
            SiteDocumentType::Skill => "skill",
        }
    }
}

/// Cross-type projection stored in `site_search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSearchDocument {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: SiteDocumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub url: String,
}

/// Blog-only projection stored in `blog_search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogSearchDocument {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub tags: Vec<String>,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<DateTime<Utc>>,
    pub url: String,
}

/// A document paired with the index it belongs in.
pub trait SearchDocument: Serialize {
    /// The index this document type is stored in.
    const INDEX: SearchIndex;

    /// The document id in the search engine.
    fn document_id(&self) -> &str;
}

impl SearchDocument for SiteSearchDocument {
    const INDEX: SearchIndex = SearchIndex::Site;

    fn document_id(&self) -> &str {
        &self.id
    }
}

impl SearchDocument for BlogSearchDocument {
    const INDEX: SearchIndex = SearchIndex::Blog;

    fn document_id(&self) -> &str {
        &self.id
    }
}

/// Build the composite `site_search` id of a skill.
pub fn skill_document_id(group_id: &str, skill_id: &str) -> String {
    format!("{}_{}", group_id, skill_id)
}

/// Whether the skill document id `document_id` could be `{content_id}_{skill}`
/// or `{group}_{content_id}`.
///
/// Group and skill ids may themselves contain `_`, so the id is matched by
/// prefix and suffix rather than split. Only meaningful for ids already known
/// to belong to skill documents.
pub fn is_skill_document_of(document_id: &str, content_id: &str) -> bool {
    if content_id.is_empty() {
        return false;
    }
    let group_match = document_id
        .strip_prefix(content_id)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('_'));
    let skill_match = document_id
        .strip_suffix(content_id)
        .is_some_and(|rest| rest.len() > 1 && rest.ends_with('_'));
    group_match || skill_match
}
