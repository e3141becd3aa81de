//! MongoDB implementation of the content store.

mod models;
mod store;

pub use models::{id_candidates, normalize_id};
pub use store::MongoContentStore;
