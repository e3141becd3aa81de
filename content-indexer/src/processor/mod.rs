//! Processor module for the content indexer ingest.
//!
//! Resolves change events against the primary store and decides what to do
//! to the search indices.

mod change_processor;
mod handler;

pub use change_processor::{decide, find_skills, ChangeProcessor, IndexAction, Resolution};
pub use handler::{ContentChangeHandler, EventHandler};
