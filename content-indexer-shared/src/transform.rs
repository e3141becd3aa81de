//! Document transformers.
//!
//! Pure functions from content records to search documents. The change
//! consumer and the reconciliation pass both go through these functions, so a
//! record indexed by either path produces the same document.

use crate::types::{
    skill_document_id, Blog, BlogSearchDocument, Job, SiteDocumentType, SiteSearchDocument, Skill,
};

/// Site URL of a blog post.
pub fn blog_url(blog_id: &str) -> String {
    format!("/blogs/{}", blog_id)
}

/// Site URL all jobs link to.
pub const JOB_URL: &str = "/employment";

/// Site URL all skills link to.
pub const SKILL_URL: &str = "/skills";

/// Project a blog post into the cross-type index.
pub fn blog_to_site_doc(blog: &Blog) -> SiteSearchDocument {
    SiteSearchDocument {
        id: blog.id.clone(),
        name: blog.title.clone(),
        doc_type: SiteDocumentType::Blog,
        short_description: blog.short_description.clone(),
        long_description: None,
        image: blog.featured_image_url.clone(),
        url: blog_url(&blog.id),
    }
}

/// Project a job into the cross-type index.
pub fn job_to_site_doc(job: &Job) -> SiteSearchDocument {
    SiteSearchDocument {
        id: job.id.clone(),
        name: job.title.clone(),
        doc_type: SiteDocumentType::Job,
        short_description: job.short_description.clone(),
        long_description: job.long_description.clone(),
        image: job.company_image.as_ref().and_then(|image| image.url.clone()),
        url: JOB_URL.to_string(),
    }
}

/// Project a skill into the cross-type index, keyed by `{group_id}_{skill_id}`.
pub fn skill_to_site_doc(skill: &Skill, group_id: &str) -> SiteSearchDocument {
    SiteSearchDocument {
        id: skill_document_id(group_id, &skill.id),
        name: skill.name.clone(),
        doc_type: SiteDocumentType::Skill,
        short_description: skill.description.clone(),
        long_description: None,
        image: skill.image.as_ref().and_then(|image| image.url.clone()),
        url: SKILL_URL.to_string(),
    }
}

/// Project a blog post into the blog-only index.
///
/// Tags and skills are indexed by name.
pub fn blog_to_blog_doc(blog: &Blog) -> BlogSearchDocument {
    BlogSearchDocument {
        id: blog.id.clone(),
        title: blog.title.clone(),
        short_description: blog.short_description.clone(),
        content: blog.content.clone(),
        tags: blog.tags.iter().map(|tag| tag.name.clone()).collect(),
        skills: blog.skills.iter().map(|skill| skill.name.clone()).collect(),
        image: blog.featured_image_url.clone(),
        published_date: blog.created_date,
        url: blog_url(&blog.id),
    }
}
