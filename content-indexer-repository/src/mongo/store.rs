//! MongoDB implementation of the content store.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use content_indexer_shared::{Blog, Job, SkillGroup};
use futures::TryStreamExt;
use mongodb::{error::ErrorKind, options::FindOptions, Client, Collection, Database};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::ContentStoreError;
use crate::interfaces::ContentStore;
use crate::mongo::models::{
    id_candidates, normalize_id, BlogRecord, DbRef, JobRecord, NamedRecord, SkillGroupRecord,
};

const BLOGS_COLLECTION: &str = "blogs";
const JOBS_COLLECTION: &str = "jobs";
const SKILL_GROUPS_COLLECTION: &str = "skill_groups";
const TAGS_COLLECTION: &str = "tags";
const SKILLS_COLLECTION: &str = "skills";

/// Reads content records out of MongoDB.
pub struct MongoContentStore {
    blogs: Collection<BlogRecord>,
    jobs: Collection<JobRecord>,
    skill_groups: Collection<SkillGroupRecord>,
    tags: Collection<NamedRecord>,
    skills: Collection<NamedRecord>,
}

impl MongoContentStore {
    pub fn new(db: &Database) -> Self {
        Self {
            blogs: db.collection(BLOGS_COLLECTION),
            jobs: db.collection(JOBS_COLLECTION),
            skill_groups: db.collection(SKILL_GROUPS_COLLECTION),
            tags: db.collection(TAGS_COLLECTION),
            skills: db.collection(SKILLS_COLLECTION),
        }
    }

    /// Connect to `uri`, check the server answers, and open `database`.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, ContentStoreError> {
        let client = Client::with_uri_str(uri).await.map_err(map_error)?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await.map_err(map_error)?;

        info!(database = %database, "Connected to MongoDB");
        Ok(Self::new(&db))
    }

    /// Resolve the tag and skill references of `records` with one query per
    /// collection and convert them into blogs.
    async fn resolve_blogs(&self, records: Vec<BlogRecord>) -> Result<Vec<Blog>, ContentStoreError> {
        let tag_refs: Vec<&DbRef> = records.iter().flat_map(BlogRecord::tag_refs).collect();
        let skill_refs: Vec<&DbRef> = records.iter().flat_map(BlogRecord::skill_refs).collect();

        let tag_names = lookup_names(&self.tags, &tag_refs).await?;
        let skill_names = lookup_names(&self.skills, &skill_refs).await?;

        Ok(records
            .into_iter()
            .map(|record| record.into_blog(&tag_names, &skill_names))
            .collect())
    }
}

/// Treat driver decode failures as decode errors, everything else as database
/// errors.
fn map_error(err: mongodb::error::Error) -> ContentStoreError {
    if let ErrorKind::BsonDeserialization(e) = err.kind.as_ref() {
        return ContentStoreError::decode(e.to_string());
    }
    ContentStoreError::from(err)
}

fn id_filter(id: &str) -> Document {
    doc! { "_id": { "$in": id_candidates(id) } }
}

async fn find_all<T>(
    collection: &Collection<T>,
    filter: Document,
    sort: Document,
) -> Result<Vec<T>, ContentStoreError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let options = FindOptions::builder().sort(sort).build();
    let cursor = collection
        .find(filter)
        .with_options(options)
        .await
        .map_err(map_error)?;

    cursor.try_collect().await.map_err(map_error)
}

/// Build an id to name table for the referenced documents.
async fn lookup_names(
    collection: &Collection<NamedRecord>,
    refs: &[&DbRef],
) -> Result<HashMap<String, String>, ContentStoreError> {
    if refs.is_empty() {
        return Ok(HashMap::new());
    }

    let mut seen = HashSet::new();
    let ids: Vec<Bson> = refs
        .iter()
        .filter(|r| seen.insert(r.id()))
        .map(|r| r.id.clone())
        .collect();

    let records: Vec<NamedRecord> = collection
        .find(doc! { "_id": { "$in": ids } })
        .await
        .map_err(map_error)?
        .try_collect()
        .await
        .map_err(map_error)?;

    let names: HashMap<String, String> = records
        .into_iter()
        .filter_map(|record| record.name.map(|name| (normalize_id(&record.id), name)))
        .collect();

    if names.len() < seen.len() {
        debug!(
            collection = %collection.name(),
            referenced = seen.len(),
            resolved = names.len(),
            "Dropping dangling references"
        );
    }

    Ok(names)
}

#[async_trait]
impl ContentStore for MongoContentStore {
    async fn find_published_blog(&self, id: &str) -> Result<Option<Blog>, ContentStoreError> {
        let mut filter = id_filter(id);
        filter.insert("published", true);

        let record = self.blogs.find_one(filter).await.map_err(map_error)?;
        match record {
            Some(record) => Ok(self.resolve_blogs(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_job(&self, id: &str) -> Result<Option<Job>, ContentStoreError> {
        let record = self.jobs.find_one(id_filter(id)).await.map_err(map_error)?;
        Ok(record.map(Job::from))
    }

    async fn list_skill_groups(&self) -> Result<Vec<SkillGroup>, ContentStoreError> {
        let records = find_all(&self.skill_groups, doc! {}, doc! { "displayOrder": 1 }).await?;
        Ok(records.into_iter().map(SkillGroup::from).collect())
    }

    async fn list_published_blogs(&self) -> Result<Vec<Blog>, ContentStoreError> {
        let records = find_all(
            &self.blogs,
            doc! { "published": true },
            doc! { "createdDate": -1 },
        )
        .await?;
        self.resolve_blogs(records).await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, ContentStoreError> {
        let records = find_all(&self.jobs, doc! {}, doc! { "startDate": -1 }).await?;
        Ok(records.into_iter().map(Job::from).collect())
    }
}
