//! Stored document shapes and their conversion into content records.
//!
//! Identifiers may be stored as ObjectIds or plain strings depending on who
//! wrote the document; both are normalised to strings here. Blog tags and
//! skills are stored as DBRefs and resolved through lookup tables built by the
//! store.

use std::collections::HashMap;

use bson::{oid::ObjectId, Bson, DateTime as BsonDateTime};
use content_indexer_shared::{Blog, Image, Job, Skill, SkillGroup, SkillRef, Tag};
use serde::Deserialize;

/// Render a stored identifier as a string.
///
/// ObjectIds become their hex form.
pub fn normalize_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// The stored forms an identifier string may take.
///
/// A 24-character hex id may have been written as an ObjectId or as a string,
/// so lookups match either.
pub fn id_candidates(id: &str) -> Vec<Bson> {
    match ObjectId::parse_str(id) {
        Ok(oid) => vec![Bson::ObjectId(oid), Bson::String(id.to_string())],
        Err(_) => vec![Bson::String(id.to_string())],
    }
}

/// A stored `{ "$ref": ..., "$id": ... }` reference.
#[derive(Debug, Clone, Deserialize)]
pub struct DbRef {
    #[serde(rename = "$id")]
    pub id: Bson,
}

impl DbRef {
    pub fn id(&self) -> String {
        normalize_id(&self.id)
    }
}

/// A document in the `tags` or `skills` collections.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRecord {
    #[serde(rename = "_id")]
    pub id: Bson,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogRecord {
    #[serde(rename = "_id")]
    pub id: Bson,
    pub title: Option<String>,
    pub short_description: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
    pub featured_image_url: Option<String>,
    pub created_date: Option<BsonDateTime>,
    pub updated_date: Option<BsonDateTime>,
    pub tags: Option<Vec<DbRef>>,
    pub skills: Option<Vec<DbRef>>,
}

impl BlogRecord {
    /// References from every tag and skill of the post.
    pub fn tag_refs(&self) -> impl Iterator<Item = &DbRef> {
        self.tags.iter().flatten()
    }

    pub fn skill_refs(&self) -> impl Iterator<Item = &DbRef> {
        self.skills.iter().flatten()
    }

    /// Convert into a blog, resolving references by id.
    ///
    /// References missing from the lookup tables are dropped.
    pub fn into_blog(
        self,
        tag_names: &HashMap<String, String>,
        skill_names: &HashMap<String, String>,
    ) -> Blog {
        let tags = self
            .tag_refs()
            .filter_map(|r| {
                let id = r.id();
                tag_names.get(&id).map(|name| Tag {
                    id,
                    name: name.clone(),
                })
            })
            .collect();
        let skills = self
            .skill_refs()
            .filter_map(|r| {
                let id = r.id();
                skill_names.get(&id).map(|name| SkillRef {
                    id,
                    name: name.clone(),
                })
            })
            .collect();

        Blog {
            id: normalize_id(&self.id),
            title: self.title.unwrap_or_default(),
            short_description: self.short_description,
            content: self.content,
            published: self.published.unwrap_or(false),
            featured_image_url: self.featured_image_url,
            created_date: self.created_date.map(BsonDateTime::to_chrono),
            updated_date: self.updated_date.map(BsonDateTime::to_chrono),
            tags,
            skills,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(rename = "_id")]
    pub id: Bson,
    pub title: Option<String>,
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
    pub skills: Option<Vec<String>>,
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Job {
            id: normalize_id(&record.id),
            title: record.title.unwrap_or_default(),
            company: record.company,
            company_url: record.company_url,
            company_image: record.company_image,
            start_date: record.start_date,
            end_date: record.end_date,
            location: record.location,
            short_description: record.short_description,
            long_description: record.long_description,
            is_education: record.is_education,
            include_on_resume: record.include_on_resume,
            skills: record.skills.unwrap_or_default(),
        }
    }
}

/// A skill embedded in a skill group. Older documents key it as `_id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecord {
    #[serde(rename = "id", alias = "_id")]
    pub id: Option<Bson>,
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub display_order: Option<i32>,
    pub description: Option<String>,
    pub image: Option<Image>,
}

impl From<SkillRecord> for Skill {
    fn from(record: SkillRecord) -> Self {
        Skill {
            id: record.id.as_ref().map(normalize_id).unwrap_or_default(),
            name: record.name.unwrap_or_default(),
            rating: record.rating,
            display_order: record.display_order,
            description: record.description,
            image: record.image,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGroupRecord {
    #[serde(rename = "_id")]
    pub id: Bson,
    pub name: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub display_order: Option<i32>,
    pub image: Option<Image>,
    pub skills: Option<Vec<SkillRecord>>,
}

impl From<SkillGroupRecord> for SkillGroup {
    fn from(record: SkillGroupRecord) -> Self {
        SkillGroup {
            id: normalize_id(&record.id),
            name: record.name.unwrap_or_default(),
            description: record.description,
            rating: record.rating,
            display_order: record.display_order,
            image: record.image,
            skills: record
                .skills
                .unwrap_or_default()
                .into_iter()
                .map(Skill::from)
                .filter(|skill| !skill.id.is_empty())
                .collect(),
        }
    }
}
