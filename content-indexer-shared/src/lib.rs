//! # Content Indexer Shared
//!
//! Shared data structures for the content indexer: the content records read
//! from the primary store, the change events announcing edits to them, the
//! search documents projected from them, and the pure transformers between the
//! two.

pub mod transform;
pub mod types;

pub use transform::{blog_to_blog_doc, blog_to_site_doc, job_to_site_doc, skill_to_site_doc};
pub use types::*;
