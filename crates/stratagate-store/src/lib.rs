//! Stratagate-Store: collaborator contracts and persistence
//!
//! This crate defines the boundary between the validation core and the
//! systems it consumes: the entity store, optional assessment and knowledge
//! lookups, the permission check and the result sink.
//!
//! ## Key Components
//!
//! - `storage_traits`: async collaborator traits and their value types
//! - `SurrealStore`: SurrealDB implementation of the store-shaped traits
//! - `fakes`: in-memory implementations for tests

mod error;
pub mod fakes;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use storage_traits::{
    AssessmentKind, AssessmentLookup, AssessmentRecord, ContentDigest, EntityKind, EntityRecord,
    EntityStore, KnowledgeLookup, Lookup, PermissionCheck, PermissionDecision, PermissionQuery,
    ResultSink, StorageResult, StoredStageGate, StoredValidation, TargetRef,
};
pub use surreal_store::SurrealStore;

/// Result type for connection and schema operations
pub type Result<T> = std::result::Result<T, StateError>;
