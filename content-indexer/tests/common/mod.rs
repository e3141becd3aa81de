//! In-memory stand-ins for the indexer's external systems.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use content_indexer::consumer::{CommitOffset, MessageSource, SourceMessage};
use content_indexer::delivery::{DeadLetterRecord, DeadLetterSink};
use content_indexer::processor::EventHandler;
use content_indexer::IngestError;
use content_indexer_repository::{
    BatchOperationResult, BatchOperationSummary, ContentStore, ContentStoreError, IndexService,
    SearchIndexError, SearchIndexProvider,
};
use content_indexer_shared::{
    Blog, ContentChangeEvent, ContentType, EventType, Job, SearchIndex, SiteDocumentType, Skill,
    SkillGroup,
};
use rdkafka::consumer::CommitMode;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const TOPIC: &str = "content-changes";

// ---------------------------------------------------------------------------
// Search engine
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EngineState {
    docs: BTreeMap<(&'static str, String), Value>,
    calls: Vec<String>,
    failing: bool,
    fail_ids: HashSet<String>,
    fail_listing: HashSet<&'static str>,
}

/// A search engine held in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemorySearchEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_service(&self) -> Arc<IndexService> {
        Arc::new(IndexService::new(Box::new(self.clone())))
    }

    pub fn seed(&self, index: SearchIndex, id: &str, document: Value) {
        self.state
            .lock()
            .unwrap()
            .docs
            .insert((index.name(), id.to_string()), document);
    }

    pub fn document(&self, index: SearchIndex, id: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .docs
            .get(&(index.name(), id.to_string()))
            .cloned()
    }

    pub fn ids(&self, index: SearchIndex) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .docs
            .keys()
            .filter(|(name, _)| *name == index.name())
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Make every request fail as if the engine were down.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Reject these ids as bulk items.
    pub fn reject_ids(&self, ids: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .fail_ids
            .extend(ids.iter().map(|id| id.to_string()));
    }

    pub fn fail_listing(&self, index: SearchIndex) {
        self.state.lock().unwrap().fail_listing.insert(index.name());
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, EngineState>, SearchIndexError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing {
            return Err(SearchIndexError::connection("engine unavailable"));
        }
        Ok(state)
    }
}

#[async_trait]
impl SearchIndexProvider for MemorySearchEngine {
    async fn ensure_index(&self, index: SearchIndex) -> Result<(), SearchIndexError> {
        self.begin(format!("ensure:{}", index))?;
        Ok(())
    }

    async fn index_document(
        &self,
        index: SearchIndex,
        id: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError> {
        let mut state = self.begin(format!("index:{}:{}", index, id))?;
        state
            .docs
            .insert((index.name(), id.to_string()), document.clone());
        Ok(())
    }

    async fn delete_document(&self, index: SearchIndex, id: &str) -> Result<(), SearchIndexError> {
        let mut state = self.begin(format!("delete:{}:{}", index, id))?;
        state.docs.remove(&(index.name(), id.to_string()));
        Ok(())
    }

    async fn bulk_index_documents(
        &self,
        index: SearchIndex,
        documents: &[(String, Value)],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut state = self.begin(format!("bulk_index:{}:{}", index, documents.len()))?;
        let mut results = Vec::with_capacity(documents.len());
        for (id, document) in documents {
            if state.fail_ids.contains(id) {
                results.push(BatchOperationResult::failed(
                    id.clone(),
                    SearchIndexError::index("mapper_parsing_exception"),
                ));
            } else {
                state
                    .docs
                    .insert((index.name(), id.clone()), document.clone());
                results.push(BatchOperationResult::succeeded(id.clone()));
            }
        }
        Ok(BatchOperationSummary::from_results(results))
    }

    async fn bulk_delete_documents(
        &self,
        index: SearchIndex,
        ids: &[String],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut state = self.begin(format!("bulk_delete:{}:{}", index, ids.len()))?;
        for id in ids {
            state.docs.remove(&(index.name(), id.clone()));
        }
        Ok(BatchOperationSummary::from_results(
            ids.iter().map(BatchOperationResult::succeeded).collect(),
        ))
    }

    async fn list_document_ids(
        &self,
        index: SearchIndex,
        limit: usize,
    ) -> Result<Vec<String>, SearchIndexError> {
        let state = self.begin(format!("list:{}", index))?;
        if state.fail_listing.contains(index.name()) {
            return Err(SearchIndexError::search("search_phase_execution_exception"));
        }
        Ok(state
            .docs
            .keys()
            .filter(|(name, _)| *name == index.name())
            .map(|(_, id)| id.clone())
            .take(limit)
            .collect())
    }

    async fn list_site_document_ids(
        &self,
        doc_type: SiteDocumentType,
        limit: usize,
    ) -> Result<Vec<String>, SearchIndexError> {
        let state = self.begin(format!("list:{}:{}", SearchIndex::Site, doc_type.as_str()))?;
        if state.fail_listing.contains(SearchIndex::Site.name()) {
            return Err(SearchIndexError::search("search_phase_execution_exception"));
        }
        Ok(state
            .docs
            .iter()
            .filter(|((name, _), doc)| {
                *name == SearchIndex::Site.name() && doc["type"] == doc_type.as_str()
            })
            .map(|((_, id), _)| id.clone())
            .take(limit)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Primary store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    blogs: Vec<Blog>,
    jobs: Vec<Job>,
    groups: Vec<SkillGroup>,
    failing: bool,
    delay: Option<Duration>,
}

/// A primary store held in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryContentStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_blog(&self, blog: Blog) {
        let mut state = self.state.lock().unwrap();
        state.blogs.retain(|b| b.id != blog.id);
        state.blogs.push(blog);
    }

    pub fn remove_blog(&self, id: &str) {
        self.state.lock().unwrap().blogs.retain(|b| b.id != id);
    }

    pub fn put_job(&self, job: Job) {
        let mut state = self.state.lock().unwrap();
        state.jobs.retain(|j| j.id != job.id);
        state.jobs.push(job);
    }

    pub fn remove_job(&self, id: &str) {
        self.state.lock().unwrap().jobs.retain(|j| j.id != id);
    }

    pub fn put_group(&self, group: SkillGroup) {
        let mut state = self.state.lock().unwrap();
        state.groups.retain(|g| g.id != group.id);
        state.groups.push(group);
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Make every read take `delay` of (tokio) time.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    async fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> Result<T, ContentStoreError> {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(ContentStoreError::database("server selection timeout"));
        }
        Ok(f(&state))
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find_published_blog(&self, id: &str) -> Result<Option<Blog>, ContentStoreError> {
        self.read(|s| s.blogs.iter().find(|b| b.id == id && b.published).cloned())
            .await
    }

    async fn find_job(&self, id: &str) -> Result<Option<Job>, ContentStoreError> {
        self.read(|s| s.jobs.iter().find(|j| j.id == id).cloned())
            .await
    }

    async fn list_skill_groups(&self) -> Result<Vec<SkillGroup>, ContentStoreError> {
        self.read(|s| {
            let mut groups = s.groups.clone();
            groups.sort_by_key(|g| g.display_order);
            groups
        })
        .await
    }

    async fn list_published_blogs(&self) -> Result<Vec<Blog>, ContentStoreError> {
        self.read(|s| s.blogs.iter().filter(|b| b.published).cloned().collect())
            .await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, ContentStoreError> {
        self.read(|s| s.jobs.clone()).await
    }
}

// ---------------------------------------------------------------------------
// Event handler and dead letters
// ---------------------------------------------------------------------------

/// Records every call. Events whose content id is in `failing` fail every
/// attempt; those in `flaky` fail the given number of times first.
#[derive(Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<(ContentChangeEvent, Instant)>>,
    failing: Mutex<HashSet<String>>,
    flaky: Mutex<HashMap<String, u32>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_always(&self, content_id: &str) {
        self.failing.lock().unwrap().insert(content_id.to_string());
    }

    pub fn fail_times(&self, content_id: &str, times: u32) {
        self.flaky
            .lock()
            .unwrap()
            .insert(content_id.to_string(), times);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<(ContentChangeEvent, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn handled_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(event, _)| event.content_id.clone())
            .collect()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &ContentChangeEvent) -> Result<(), IngestError> {
        self.calls
            .lock()
            .unwrap()
            .push((event.clone(), Instant::now()));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(&event.content_id) {
            return Err(IngestError::SearchIndexError(SearchIndexError::connection(
                "connection refused",
            )));
        }

        let mut flaky = self.flaky.lock().unwrap();
        if let Some(remaining) = flaky.get_mut(&event.content_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(IngestError::SearchIndexError(SearchIndexError::connection(
                    "timed out",
                )));
            }
        }
        Ok(())
    }
}

/// Collects dead-letter records, optionally failing the first publishes.
#[derive(Default)]
pub struct RecordingDeadLetters {
    records: Mutex<Vec<DeadLetterRecord>>,
    attempts: AtomicU32,
    failures_left: AtomicU32,
    fail_always: Mutex<bool>,
}

impl RecordingDeadLetters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_times(&self, times: u32) {
        self.failures_left.store(times, Ordering::SeqCst);
    }

    pub fn set_fail_always(&self, fail: bool) {
        *self.fail_always.lock().unwrap() = fail;
    }

    pub fn records(&self) -> Vec<DeadLetterRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeadLetterSink for RecordingDeadLetters {
    async fn publish(&self, record: &DeadLetterRecord) -> Result<(), IngestError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if *self.fail_always.lock().unwrap() {
            return Err(IngestError::dead_letter("broker unavailable"));
        }
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(IngestError::dead_letter("broker unavailable"));
        }

        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Message source
// ---------------------------------------------------------------------------

/// A message source fed by the test. Once the queue is empty `recv` waits.
pub struct MockSource {
    sender: mpsc::UnboundedSender<SourceMessage>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<SourceMessage>>,
    commits: Mutex<Vec<(CommitOffset, bool)>>,
    subscribed: Mutex<bool>,
}

impl MockSource {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            commits: Mutex::new(Vec::new()),
            subscribed: Mutex::new(false),
        }
    }

    pub fn push(&self, message: SourceMessage) {
        let _ = self.sender.send(message);
    }

    pub fn is_subscribed(&self) -> bool {
        *self.subscribed.lock().unwrap()
    }

    /// The latest committed position of `partition`.
    pub fn committed(&self, partition: i32) -> Option<i64> {
        self.commits
            .lock()
            .unwrap()
            .iter()
            .filter(|(commit, _)| commit.partition == partition)
            .map(|(commit, _)| commit.offset)
            .last()
    }

    /// Every position committed so far for `partition`, in commit order.
    pub fn commit_history(&self, partition: i32) -> Vec<i64> {
        self.commits
            .lock()
            .unwrap()
            .iter()
            .filter(|(commit, _)| commit.partition == partition)
            .map(|(commit, _)| commit.offset)
            .collect()
    }

    pub fn sync_commits(&self) -> Vec<CommitOffset> {
        self.commits
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, sync)| *sync)
            .map(|(commit, _)| commit.clone())
            .collect()
    }
}

#[async_trait]
impl MessageSource for MockSource {
    fn subscribe(&self) -> Result<(), IngestError> {
        *self.subscribed.lock().unwrap() = true;
        Ok(())
    }

    async fn recv(&self) -> Result<SourceMessage, IngestError> {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(message) => Ok(message),
            None => std::future::pending().await,
        }
    }

    fn commit(&self, offsets: &[CommitOffset], mode: CommitMode) -> Result<(), IngestError> {
        let sync = matches!(mode, CommitMode::Sync);
        self.commits
            .lock()
            .unwrap()
            .extend(offsets.iter().cloned().map(|commit| (commit, sync)));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn event_payload(event_type: EventType, content_type: ContentType, id: &str) -> Vec<u8> {
    ContentChangeEvent::new(event_type, content_type, id)
        .to_vec()
        .unwrap()
}

/// A change-event message keyed by content id, as the publisher sends it.
pub fn event_message(
    partition: i32,
    offset: i64,
    event_type: EventType,
    content_type: ContentType,
    id: &str,
) -> SourceMessage {
    SourceMessage::new(
        TOPIC,
        partition,
        offset,
        Some(id.as_bytes().to_vec()),
        Some(event_payload(event_type, content_type, id)),
    )
}

pub fn blog(id: &str, title: &str, published: bool) -> Blog {
    Blog {
        id: id.to_string(),
        title: title.to_string(),
        published,
        ..Default::default()
    }
}

pub fn job(id: &str, title: &str) -> Job {
    Job {
        id: id.to_string(),
        title: title.to_string(),
        ..Default::default()
    }
}

pub fn skill(id: &str, name: &str) -> Skill {
    Skill {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn group(id: &str, display_order: i32, skills: Vec<Skill>) -> SkillGroup {
    SkillGroup {
        id: id.to_string(),
        name: id.to_string(),
        display_order: Some(display_order),
        skills,
        ..Default::default()
    }
}

/// Poll `condition` every 10ms of (tokio) time, giving up after ~60s.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..6000 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
