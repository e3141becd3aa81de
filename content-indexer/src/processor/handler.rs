use async_trait::async_trait;
use content_indexer_shared::ContentChangeEvent;

use crate::errors::IngestError;
use crate::loader::IndexLoader;
use crate::processor::ChangeProcessor;

/// Handles one decoded change event. Implementations must be safe to call
/// again with the same event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &ContentChangeEvent) -> Result<(), IngestError>;
}

/// Resolves an event and applies the resulting index write.
pub struct ContentChangeHandler {
    processor: ChangeProcessor,
    loader: IndexLoader,
}

impl ContentChangeHandler {
    pub fn new(processor: ChangeProcessor, loader: IndexLoader) -> Self {
        Self { processor, loader }
    }
}

#[async_trait]
impl EventHandler for ContentChangeHandler {
    async fn handle(&self, event: &ContentChangeEvent) -> Result<(), IngestError> {
        let action = self.processor.process(event).await?;
        self.loader.apply(action).await
    }
}
