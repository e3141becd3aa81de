//! Core data structures shared across the content indexer: content records,
//! change events and the search documents derived from them.

pub mod change_event;
pub mod content;
pub mod documents;

pub use change_event::{ContentChangeEvent, ContentType, EventType};
pub use content::{Blog, Image, Job, Skill, SkillGroup, SkillRef, Tag};
pub use documents::{
    is_skill_document_of, skill_document_id, BlogSearchDocument, SearchDocument, SearchIndex,
    SiteDocumentType, SiteSearchDocument, BLOG_SEARCH_INDEX, SITE_SEARCH_INDEX,
};
