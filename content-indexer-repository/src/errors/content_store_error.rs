//! Primary store error types.

use thiserror::Error;

/// Errors from reading content out of the primary store.
#[derive(Debug, Clone, Error)]
pub enum ContentStoreError {
    /// The database rejected or failed a query.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored document could not be decoded into a content record.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl ContentStoreError {
    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }
}

impl From<mongodb::error::Error> for ContentStoreError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}
