//! Content records as read from the primary store.
//!
//! These are the read-model shapes the indexer consumes. The store adapter is
//! responsible for resolving references (blog tags and skills) and normalising
//! identifiers to strings before handing records out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An image attached to a job, skill or skill group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: Option<String>,
    pub name: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub mime: Option<String>,
}

/// A blog tag, resolved from its reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// A skill referenced by a blog post, resolved from its reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillRef {
    pub id: String,
    pub name: String,
}

/// A blog post.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: String,
    pub title: String,
    pub short_description: Option<String>,
    pub content: Option<String>,
    pub published: bool,
    pub featured_image_url: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub skills: Vec<SkillRef>,
}

/// An employment or education entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: Option<String>,
    pub company_url: Option<String>,
    pub company_image: Option<Image>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub is_education: Option<bool>,
    pub include_on_resume: Option<bool>,
    /// Skill names.
    #[serde(default)]
    pub skills: Vec<String>,
}

/// A skill nested inside a [`SkillGroup`].
///
/// Skills have no top-level identity in the primary store; a skill is
/// addressed by the pair `(group id, skill id)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub rating: Option<f64>,
    pub display_order: Option<i32>,
    pub description: Option<String>,
    pub image: Option<Image>,
}

/// A group of skills, stored as one document with the skills embedded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub display_order: Option<i32>,
    pub image: Option<Image>,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

impl SkillGroup {
    /// Find a nested skill by its own identifier.
    pub fn skill(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.iter().find(|skill| skill.id == skill_id)
    }
}
