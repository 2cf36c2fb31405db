//! In-memory fakes for collaborator traits (testing only)
//!
//! Provides `MemoryEntityStore`, `MemoryAssessmentLookup`,
//! `MemoryKnowledgeLookup`, `StaticPermissionCheck` and `MemoryResultSink`
//! that satisfy the trait contracts without any external dependencies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryEntityStore
// ---------------------------------------------------------------------------

/// In-memory entity store keyed by `TargetRef`.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    entities: Mutex<HashMap<TargetRef, EntityRecord>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity.
    pub fn insert(&self, record: EntityRecord) {
        let mut entities = self.entities.lock().unwrap();
        entities.insert(record.target(), record);
    }

    /// Convenience: insert from a JSON object literal.
    pub fn insert_json(&self, kind: EntityKind, id: &str, fields: serde_json::Value) {
        let fields = match fields {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        self.insert(EntityRecord {
            kind,
            id: id.to_string(),
            fields,
        });
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn get(&self, target: &TargetRef) -> StorageResult<Option<EntityRecord>> {
        let entities = self.entities.lock().unwrap();
        Ok(entities.get(target).cloned())
    }

    async fn update_fields(
        &self,
        target: &TargetRef,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> StorageResult<()> {
        let mut entities = self.entities.lock().unwrap();
        let record = entities
            .get_mut(target)
            .ok_or_else(|| StorageError::EntityNotFound {
                kind: target.kind.to_string(),
                id: target.id.clone(),
            })?;
        record.fields.extend(fields);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryAssessmentLookup
// ---------------------------------------------------------------------------

/// In-memory assessment lookup. `unavailable()` builds one that always
/// reports a degraded lookup.
#[derive(Debug, Default)]
pub struct MemoryAssessmentLookup {
    assessments: Mutex<Vec<AssessmentRecord>>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl MemoryAssessmentLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, record: AssessmentRecord) {
        self.assessments.lock().unwrap().push(record);
    }

    /// Number of `list_by_target` calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssessmentLookup for MemoryAssessmentLookup {
    async fn list_by_target(&self, target: &TargetRef) -> Lookup<Vec<AssessmentRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Lookup::Degraded {
                reason: "assessment service unavailable".to_string(),
            };
        }
        let assessments = self.assessments.lock().unwrap();
        Lookup::from_vec(
            assessments
                .iter()
                .filter(|a| &a.target == target)
                .cloned()
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// MemoryKnowledgeLookup
// ---------------------------------------------------------------------------

/// In-memory knowledge lookup keyed by project id.
#[derive(Debug, Default)]
pub struct MemoryKnowledgeLookup {
    comparisons: Mutex<HashMap<String, Vec<serde_json::Value>>>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl MemoryKnowledgeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, project_id: &str, entry: serde_json::Value) {
        self.comparisons
            .lock()
            .unwrap()
            .entry(project_id.to_string())
            .or_default()
            .push(entry);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeLookup for MemoryKnowledgeLookup {
    async fn comparisons(&self, project_id: &str) -> Lookup<Vec<serde_json::Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Lookup::Degraded {
                reason: "knowledge service unavailable".to_string(),
            };
        }
        let comparisons = self.comparisons.lock().unwrap();
        Lookup::from_vec(comparisons.get(project_id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// StaticPermissionCheck
// ---------------------------------------------------------------------------

/// Permission check that always returns the same decision.
#[derive(Debug)]
pub struct StaticPermissionCheck {
    decision: PermissionDecision,
    queries: Mutex<Vec<PermissionQuery>>,
}

impl StaticPermissionCheck {
    pub fn new(decision: PermissionDecision) -> Self {
        Self {
            decision,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn allow() -> Self {
        Self::new(PermissionDecision::Allow)
    }

    pub fn deny(reason: &str) -> Self {
        Self::new(PermissionDecision::Deny {
            reason: reason.to_string(),
        })
    }

    pub fn unreachable() -> Self {
        Self::new(PermissionDecision::Unavailable {
            reason: "connection refused".to_string(),
        })
    }

    /// Every query received so far.
    pub fn queries(&self) -> Vec<PermissionQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PermissionCheck for StaticPermissionCheck {
    async fn check(&self, query: &PermissionQuery) -> PermissionDecision {
        self.queries.lock().unwrap().push(query.clone());
        self.decision.clone()
    }
}

// ---------------------------------------------------------------------------
// MemoryResultSink
// ---------------------------------------------------------------------------

/// In-memory result sink: a vector of validations and a map of stage gates.
#[derive(Debug, Default)]
pub struct MemoryResultSink {
    validations: Mutex<Vec<StoredValidation>>,
    stage_gates: Mutex<HashMap<(String, u8), StoredStageGate>>,
    stage_gate_writes: AtomicUsize,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of validation records appended.
    pub fn validation_count(&self) -> usize {
        self.validations.lock().unwrap().len()
    }

    /// Number of `upsert_stage_gate` calls (including overwrites).
    pub fn stage_gate_writes(&self) -> usize {
        self.stage_gate_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultSink for MemoryResultSink {
    async fn append_validation(&self, record: StoredValidation) -> StorageResult<()> {
        let mut validations = self.validations.lock().unwrap();
        if validations.iter().any(|v| v.record_id == record.record_id) {
            return Err(StorageError::DuplicateRecord {
                record_id: record.record_id,
            });
        }
        validations.push(record);
        Ok(())
    }

    async fn get_validation(&self, record_id: &str) -> StorageResult<StoredValidation> {
        let validations = self.validations.lock().unwrap();
        validations
            .iter()
            .find(|v| v.record_id == record_id)
            .cloned()
            .ok_or_else(|| StorageError::RecordNotFound {
                record_id: record_id.to_string(),
            })
    }

    async fn list_validations(&self, target: &TargetRef) -> StorageResult<Vec<StoredValidation>> {
        let validations = self.validations.lock().unwrap();
        let mut out: Vec<StoredValidation> = validations
            .iter()
            .filter(|v| &v.target == target)
            .cloned()
            .collect();
        // Stable sort keeps append order among equal timestamps; reverse for newest first.
        out.sort_by_key(|v| v.created_at);
        out.reverse();
        Ok(out)
    }

    async fn upsert_stage_gate(&self, result: StoredStageGate) -> StorageResult<()> {
        self.stage_gate_writes.fetch_add(1, Ordering::SeqCst);
        let mut gates = self.stage_gates.lock().unwrap();
        gates.insert((result.project_id.clone(), result.gate_number), result);
        Ok(())
    }

    async fn latest_stage_gate(
        &self,
        project_id: &str,
        gate_number: u8,
    ) -> StorageResult<Option<StoredStageGate>> {
        let gates = self.stage_gates.lock().unwrap();
        Ok(gates.get(&(project_id.to_string(), gate_number)).cloned())
    }
}
