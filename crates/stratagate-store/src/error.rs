//! Error types for stratagate-store

use thiserror::Error;

/// Errors raised while connecting to or preparing the persistence backend.
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Errors returned by collaborator trait implementations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested entity does not exist in the entity store.
    #[error("entity not found: {kind}/{id}")]
    EntityNotFound { kind: String, id: String },

    /// The requested validation record does not exist.
    #[error("validation record not found: {record_id}")]
    RecordNotFound { record_id: String },

    /// A validation record with this id was already appended.
    #[error("validation record already exists: {record_id}")]
    DuplicateRecord { record_id: String },

    /// A digest string was not 64 lowercase hex characters.
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },

    /// A stored row could not be mapped back into a domain value.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend (database) failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}
