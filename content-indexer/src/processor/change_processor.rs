//! Change event resolution.
//!
//! Events only say that something changed. The processor re-reads the primary
//! store to learn the current state and turns the event plus that state into
//! an [`IndexAction`]. Because nothing is taken from the event beyond its
//! coordinates, re-running an event is always safe.

use std::sync::Arc;

use content_indexer_repository::ContentStore;
use content_indexer_shared::{
    Blog, ContentChangeEvent, ContentType, EventType, Job, Skill, SkillGroup,
};
use tracing::{debug, instrument};

use crate::errors::IngestError;

/// The current state of the content an event refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A published blog post.
    Blog(Blog),
    Job(Job),
    /// Skills to index, all nested in `group_id`.
    Skills { group_id: String, skills: Vec<Skill> },
    /// No eligible record exists.
    Missing,
    /// The store was not consulted (delete events).
    NotResolved,
}

/// A write against the search indices.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexAction {
    IndexBlog(Blog),
    DeleteBlog(String),
    IndexJob(Job),
    DeleteJob(String),
    IndexSkills { group_id: String, skills: Vec<Skill> },
    DeleteSkill(String),
}

impl IndexAction {
    /// The delete for `content_id` of the given content type.
    pub fn delete(content_type: ContentType, content_id: impl Into<String>) -> Self {
        let content_id = content_id.into();
        match content_type {
            ContentType::Blog => IndexAction::DeleteBlog(content_id),
            ContentType::Job => IndexAction::DeleteJob(content_id),
            ContentType::Skill => IndexAction::DeleteSkill(content_id),
        }
    }
}

/// Decide the index write for an event given what the store holds.
///
/// Deletes always delete. Creates and updates index the resolved record, or
/// delete when there is nothing eligible to index, which also removes posts
/// that were unpublished.
pub fn decide(event: &ContentChangeEvent, resolution: Resolution) -> IndexAction {
    match event.event_type {
        EventType::Deleted => IndexAction::delete(event.content_type, &event.content_id),
        EventType::Created | EventType::Updated => match (event.content_type, resolution) {
            (ContentType::Blog, Resolution::Blog(blog)) => IndexAction::IndexBlog(blog),
            (ContentType::Job, Resolution::Job(job)) => IndexAction::IndexJob(job),
            (ContentType::Skill, Resolution::Skills { group_id, skills }) => {
                IndexAction::IndexSkills { group_id, skills }
            }
            (content_type, _) => IndexAction::delete(content_type, &event.content_id),
        },
    }
}

/// Find the skills a skill event's `content_id` refers to.
///
/// The id is first matched against skill ids across every group, then against
/// group ids; groups are scanned in the order given and the first hit wins. A
/// skill hit selects that one skill; a group hit selects all of the group's
/// skills, and a group without skills is not a hit.
pub fn find_skills(groups: &[SkillGroup], content_id: &str) -> Option<(String, Vec<Skill>)> {
    groups
        .iter()
        .find_map(|group| {
            group
                .skill(content_id)
                .map(|skill| (group.id.clone(), vec![skill.clone()]))
        })
        .or_else(|| {
            groups
                .iter()
                .find(|group| group.id == content_id && !group.skills.is_empty())
                .map(|group| (group.id.clone(), group.skills.clone()))
        })
}

/// Resolves change events against the primary store.
pub struct ChangeProcessor {
    store: Arc<dyn ContentStore>,
}

impl ChangeProcessor {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Look up the current state of the event's content.
    pub async fn resolve(&self, event: &ContentChangeEvent) -> Result<Resolution, IngestError> {
        if event.event_type == EventType::Deleted {
            return Ok(Resolution::NotResolved);
        }

        let id = event.content_id.as_str();
        let resolution = match event.content_type {
            ContentType::Blog => self
                .store
                .find_published_blog(id)
                .await?
                .map_or(Resolution::Missing, Resolution::Blog),
            ContentType::Job => self
                .store
                .find_job(id)
                .await?
                .map_or(Resolution::Missing, Resolution::Job),
            ContentType::Skill => {
                let groups = self.store.list_skill_groups().await?;
                find_skills(&groups, id).map_or(Resolution::Missing, |(group_id, skills)| {
                    Resolution::Skills { group_id, skills }
                })
            }
        };
        Ok(resolution)
    }

    /// Resolve the event and decide the index write.
    #[instrument(
        skip(self, event),
        fields(
            event_type = %event.event_type,
            content_type = %event.content_type,
            content_id = %event.content_id
        )
    )]
    pub async fn process(&self, event: &ContentChangeEvent) -> Result<IndexAction, IngestError> {
        let resolution = self.resolve(event).await?;
        if resolution == Resolution::Missing {
            debug!("No eligible record, removing from indices");
        }
        Ok(decide(event, resolution))
    }
}
