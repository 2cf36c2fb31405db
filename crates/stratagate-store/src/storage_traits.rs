//! Collaborator trait definitions for Stratagate
//!
//! These traits describe everything the validation core consumes from the
//! outside world:
//! - `EntityStore`: generic record store (get-by-id, update-fields)
//! - `AssessmentLookup`: cross-validation / contextual assessment existence
//! - `KnowledgeLookup`: comparison data used to enrich stage-gate judgments
//! - `PermissionCheck`: access-control decision for an actor on a target
//! - `ResultSink`: append-only validation records and upserted stage-gate results
//!
//! Optional lookups never fail: they return [`Lookup::Degraded`] or
//! [`PermissionDecision::Unavailable`] so callers compose without error paths.
//! In-memory fakes are provided in the `fakes` module.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Target addressing
// ---------------------------------------------------------------------------

/// The kinds of entity a validation can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Strategy,
    Analysis,
    Deliverable,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Project,
        EntityKind::Strategy,
        EntityKind::Analysis,
        EntityKind::Deliverable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Strategy => "strategy",
            EntityKind::Analysis => "analysis",
            EntityKind::Deliverable => "deliverable",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StorageError::InvalidRecord(format!("unknown entity kind: {s}")))
    }
}

/// Reference to a concrete entity: kind plus id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub kind: EntityKind,
    pub id: String,
}

impl TargetRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityStore
// ---------------------------------------------------------------------------

/// A raw entity as held by the store: kind, id and an open field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub id: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl EntityRecord {
    pub fn target(&self) -> TargetRef {
        TargetRef::new(self.kind, self.id.clone())
    }
}

/// Generic entity store.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch an entity. `Ok(None)` when it does not exist.
    async fn get(&self, target: &TargetRef) -> StorageResult<Option<EntityRecord>>;

    /// Merge `fields` into an existing entity, overwriting keys that exist.
    ///
    /// Returns `StorageError::EntityNotFound` if the entity is absent.
    async fn update_fields(
        &self,
        target: &TargetRef,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// Optional lookups
// ---------------------------------------------------------------------------

/// Outcome of an optional auxiliary lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Data was found.
    Found(T),
    /// The collaborator answered but had nothing for this target.
    Absent,
    /// The collaborator could not answer; callers fall back to defaults.
    Degraded { reason: String },
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Lookup::Degraded { .. })
    }

    /// Collapse to an `Option`, treating degraded lookups as absent.
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::Absent | Lookup::Degraded { .. } => None,
        }
    }
}

impl<T> Lookup<Vec<T>> {
    /// `Found` for a non-empty vector, `Absent` otherwise.
    pub fn from_vec(items: Vec<T>) -> Self {
        if items.is_empty() {
            Lookup::Absent
        } else {
            Lookup::Found(items)
        }
    }
}

/// The assessment families the governance layer looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    /// Independent cross-validation analysis of the target.
    CrossValidation,
    /// Contextual or compliance assessment of the target.
    Contextual,
}

impl AssessmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentKind::CrossValidation => "cross_validation",
            AssessmentKind::Contextual => "contextual",
        }
    }
}

/// An assessment linked to a validation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub assessment_id: String,
    pub target: TargetRef,
    pub kind: AssessmentKind,
    pub created_at: DateTime<Utc>,
}

/// Cross-validation / assessment lookup.
#[async_trait]
pub trait AssessmentLookup: Send + Sync {
    /// All assessments linked to `target`. Never errors.
    async fn list_by_target(&self, target: &TargetRef) -> Lookup<Vec<AssessmentRecord>>;
}

/// Knowledge lookup supplying comparison data for stage-gate judgments.
#[async_trait]
pub trait KnowledgeLookup: Send + Sync {
    /// Comparison entries (benchmarks, similar cases) for a project. Never errors.
    async fn comparisons(&self, project_id: &str) -> Lookup<Vec<serde_json::Value>>;
}

// ---------------------------------------------------------------------------
// PermissionCheck
// ---------------------------------------------------------------------------

/// Access-control question: may `actor` perform `action` on `target`?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionQuery {
    pub actor: String,
    pub target: TargetRef,
    pub action: String,
}

/// Answer from the permission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PermissionDecision {
    Allow,
    Deny { reason: String },
    /// The collaborator could not be reached or answered garbage.
    Unavailable { reason: String },
}

/// Access-control collaborator.
#[async_trait]
pub trait PermissionCheck: Send + Sync {
    async fn check(&self, query: &PermissionQuery) -> PermissionDecision;
}

// ---------------------------------------------------------------------------
// ResultSink
// ---------------------------------------------------------------------------

/// A persisted validation outcome.
///
/// `payload` holds the full serialized record; the scalar columns exist for
/// indexing and listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValidation {
    pub record_id: String,
    pub target: TargetRef,
    pub status: String,
    pub aggregate_score: u8,
    pub digest: ContentDigest,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// The latest stage-gate result for one `(project_id, gate_number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredStageGate {
    pub project_id: String,
    pub gate_number: u8,
    pub passed: bool,
    pub payload: serde_json::Value,
    pub evaluated_at: DateTime<Utc>,
}

/// Outcome persistence.
///
/// Guarantees:
/// - `append_validation` never overwrites; a repeated `record_id` is rejected
///   with `StorageError::DuplicateRecord`.
/// - `upsert_stage_gate` keeps exactly one row per `(project_id, gate_number)`;
///   the last write wins.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn append_validation(&self, record: StoredValidation) -> StorageResult<()>;

    /// Returns `StorageError::RecordNotFound` if absent.
    async fn get_validation(&self, record_id: &str) -> StorageResult<StoredValidation>;

    /// All records for a target, newest first.
    async fn list_validations(&self, target: &TargetRef) -> StorageResult<Vec<StoredValidation>>;

    async fn upsert_stage_gate(&self, result: StoredStageGate) -> StorageResult<()>;

    async fn latest_stage_gate(
        &self,
        project_id: &str,
        gate_number: u8,
    ) -> StorageResult<Option<StoredStageGate>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_round_trips_through_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("portfolio".parse::<EntityKind>().is_err());
    }

    #[test]
    fn lookup_from_vec_empty_is_absent() {
        let l: Lookup<Vec<u8>> = Lookup::from_vec(vec![]);
        assert_eq!(l, Lookup::Absent);
        assert_eq!(Lookup::from_vec(vec![1u8]), Lookup::Found(vec![1]));
    }

    #[test]
    fn degraded_lookup_collapses_to_none() {
        let l: Lookup<u8> = Lookup::Degraded {
            reason: "timeout".into(),
        };
        assert!(l.is_degraded());
        assert_eq!(l.found(), None);
    }

    #[test]
    fn digest_rejects_short_hex() {
        assert!(ContentDigest::try_from("abc".to_string()).is_err());
        let d = ContentDigest::from_bytes(b"x");
        assert_eq!(ContentDigest::try_from(d.as_str().to_string()).unwrap(), d);
        assert_eq!(d.short().len(), 12);
    }

    #[test]
    fn permission_decision_serde_is_tagged() {
        let json = serde_json::to_value(PermissionDecision::Deny {
            reason: "no role".into(),
        })
        .unwrap();
        assert_eq!(json["decision"], "deny");
        assert_eq!(json["reason"], "no role");
    }
}
