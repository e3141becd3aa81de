//! Content change events.
//!
//! One event is published per admin mutation. Events are immutable and
//! delivered at least once, so everything downstream treats them as hints to
//! re-read the primary store rather than as carriers of state.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// What happened to the content item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    #[serde(alias = "created")]
    Created,
    #[serde(alias = "updated")]
    Updated,
    #[serde(alias = "deleted")]
    Deleted,
}

/// Which kind of content the event refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    #[serde(alias = "blog")]
    Blog,
    #[serde(alias = "job")]
    Job,
    #[serde(alias = "skill")]
    Skill,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventType::Created => "CREATED",
            EventType::Updated => "UPDATED",
            EventType::Deleted => "DELETED",
        };
        f.write_str(name)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContentType::Blog => "BLOG",
            ContentType::Job => "JOB",
            ContentType::Skill => "SKILL",
        };
        f.write_str(name)
    }
}

/// A notification that a content item was created, updated or deleted.
///
/// For skills, `content_id` may be either the skill's own id or the id of the
/// skill group it is nested in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentChangeEvent {
    pub event_type: EventType,
    pub content_type: ContentType,
    pub content_id: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ContentChangeEvent {
    pub fn new(event_type: EventType, content_type: ContentType, content_id: impl Into<String>) -> Self {
        Self {
            event_type,
            content_type,
            content_id: content_id.into(),
            timestamp: Some(Utc::now()),
        }
    }

    /// Decode an event from a JSON message payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Encode the event as a JSON message payload.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Timestamps arrive either as RFC 3339 strings or as epoch seconds with an
/// optional fractional part.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Seconds(f64),
    }

    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawTimestamp::Text(text)) => DateTime::parse_from_rfc3339(&text)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
        Some(RawTimestamp::Seconds(seconds)) => {
            let whole = seconds.trunc() as i64;
            let nanos = ((seconds - seconds.trunc()) * 1e9).round() as u32;
            Utc.timestamp_opt(whole, nanos.min(999_999_999))
                .single()
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", seconds)))
        }
    }
}
