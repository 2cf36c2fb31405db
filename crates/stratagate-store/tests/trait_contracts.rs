//! Trait contract tests for EntityStore, ResultSink and the optional lookups.
//!
//! Each contract is written once against `&dyn Trait` and run against both the
//! in-memory fakes and `SurrealStore::in_memory()`.

use chrono::{Duration, Utc};
use serde_json::json;
use stratagate_store::fakes::{
    MemoryAssessmentLookup, MemoryEntityStore, MemoryKnowledgeLookup, MemoryResultSink,
};
use stratagate_store::storage_traits::*;
use stratagate_store::{StorageError, SurrealStore};

fn project(id: &str) -> TargetRef {
    TargetRef::new(EntityKind::Project, id)
}

fn stored(record_id: &str, target: TargetRef, offset_secs: i64) -> StoredValidation {
    StoredValidation {
        record_id: record_id.to_string(),
        target,
        status: "passed".to_string(),
        aggregate_score: 82,
        digest: ContentDigest::from_bytes(record_id.as_bytes()),
        payload: json!({ "record_id": record_id }),
        created_at: Utc::now() + Duration::seconds(offset_secs),
    }
}

fn gate(project_id: &str, gate_number: u8, passed: bool) -> StoredStageGate {
    StoredStageGate {
        project_id: project_id.to_string(),
        gate_number,
        passed,
        payload: json!({ "passed": passed }),
        evaluated_at: Utc::now(),
    }
}

// ===========================================================================
// ResultSink contracts
// ===========================================================================

async fn sink_append_then_get(sink: &dyn ResultSink) {
    sink.append_validation(stored("r-1", project("p-1"), 0))
        .await
        .unwrap();
    let got = sink.get_validation("r-1").await.unwrap();
    assert_eq!(got.record_id, "r-1");
    assert_eq!(got.target, project("p-1"));
    assert_eq!(got.aggregate_score, 82);
    assert_eq!(got.payload["record_id"], "r-1");
}

async fn sink_rejects_duplicate_record(sink: &dyn ResultSink) {
    sink.append_validation(stored("dup", project("p-1"), 0))
        .await
        .unwrap();
    let err = sink
        .append_validation(stored("dup", project("p-1"), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateRecord { .. }));
}

async fn sink_get_missing_is_not_found(sink: &dyn ResultSink) {
    let err = sink.get_validation("nope").await.unwrap_err();
    assert!(matches!(err, StorageError::RecordNotFound { .. }));
}

async fn sink_lists_newest_first_per_target(sink: &dyn ResultSink) {
    sink.append_validation(stored("old", project("p-9"), -60))
        .await
        .unwrap();
    sink.append_validation(stored("new", project("p-9"), 0))
        .await
        .unwrap();
    sink.append_validation(stored("other", project("p-8"), 0))
        .await
        .unwrap();

    let listed = sink.list_validations(&project("p-9")).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|v| v.record_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
}

async fn sink_stage_gate_last_write_wins(sink: &dyn ResultSink) {
    assert!(sink.latest_stage_gate("p-1", 1).await.unwrap().is_none());

    sink.upsert_stage_gate(gate("p-1", 1, false)).await.unwrap();
    sink.upsert_stage_gate(gate("p-1", 1, true)).await.unwrap();
    sink.upsert_stage_gate(gate("p-1", 2, false)).await.unwrap();

    let latest = sink.latest_stage_gate("p-1", 1).await.unwrap().unwrap();
    assert!(latest.passed);
    let other = sink.latest_stage_gate("p-1", 2).await.unwrap().unwrap();
    assert!(!other.passed);
}

#[tokio::test]
async fn memory_sink_contracts() {
    sink_append_then_get(&MemoryResultSink::new()).await;
    sink_rejects_duplicate_record(&MemoryResultSink::new()).await;
    sink_get_missing_is_not_found(&MemoryResultSink::new()).await;
    sink_lists_newest_first_per_target(&MemoryResultSink::new()).await;
    sink_stage_gate_last_write_wins(&MemoryResultSink::new()).await;
}

#[tokio::test]
async fn surreal_sink_contracts() {
    sink_append_then_get(&SurrealStore::in_memory().await.unwrap()).await;
    sink_rejects_duplicate_record(&SurrealStore::in_memory().await.unwrap()).await;
    sink_get_missing_is_not_found(&SurrealStore::in_memory().await.unwrap()).await;
    sink_lists_newest_first_per_target(&SurrealStore::in_memory().await.unwrap()).await;
    sink_stage_gate_last_write_wins(&SurrealStore::in_memory().await.unwrap()).await;
}

// ===========================================================================
// EntityStore contracts
// ===========================================================================

async fn entity_update_merges_fields(store: &dyn EntityStore) {
    let target = project("p-1");
    let record = store.get(&target).await.unwrap().unwrap();
    assert_eq!(record.fields["title"], "Expansion");

    let mut patch = serde_json::Map::new();
    patch.insert("status".into(), json!("approved"));
    store.update_fields(&target, patch).await.unwrap();

    let record = store.get(&target).await.unwrap().unwrap();
    assert_eq!(record.fields["title"], "Expansion");
    assert_eq!(record.fields["status"], "approved");
}

async fn entity_missing_is_none_and_update_fails(store: &dyn EntityStore) {
    let missing = TargetRef::new(EntityKind::Strategy, "ghost");
    assert!(store.get(&missing).await.unwrap().is_none());
    let err = store
        .update_fields(&missing, serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::EntityNotFound { .. }));
}

fn seed_record() -> EntityRecord {
    let fields = json!({ "title": "Expansion", "status": "draft" });
    EntityRecord {
        kind: EntityKind::Project,
        id: "p-1".to_string(),
        fields: fields.as_object().unwrap().clone(),
    }
}

#[tokio::test]
async fn memory_entity_store_contracts() {
    let store = MemoryEntityStore::new();
    store.insert(seed_record());
    entity_update_merges_fields(&store).await;
    entity_missing_is_none_and_update_fails(&store).await;
}

#[tokio::test]
async fn surreal_entity_store_contracts() {
    let store = SurrealStore::in_memory().await.unwrap();
    store.put_entity(&seed_record()).await.unwrap();
    entity_update_merges_fields(&store).await;
    entity_missing_is_none_and_update_fails(&store).await;
}

#[tokio::test]
async fn surreal_put_entity_replaces_existing() {
    let store = SurrealStore::in_memory().await.unwrap();
    store.put_entity(&seed_record()).await.unwrap();
    let mut replacement = seed_record();
    replacement.fields.remove("status");
    store.put_entity(&replacement).await.unwrap();

    let got = store.get(&project("p-1")).await.unwrap().unwrap();
    assert!(!got.fields.contains_key("status"));
}

// ===========================================================================
// Lookup contracts
// ===========================================================================

fn assessment(id: &str, target: TargetRef, kind: AssessmentKind) -> AssessmentRecord {
    AssessmentRecord {
        assessment_id: id.to_string(),
        target,
        kind,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn memory_assessment_lookup_filters_by_target() {
    let lookup = MemoryAssessmentLookup::new();
    lookup.insert(assessment("a1", project("p-1"), AssessmentKind::CrossValidation));
    lookup.insert(assessment("a2", project("p-2"), AssessmentKind::Contextual));

    let found = lookup.list_by_target(&project("p-1")).await.found().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].kind, AssessmentKind::CrossValidation);
    assert_eq!(
        lookup.list_by_target(&project("p-3")).await,
        Lookup::Absent
    );
}

#[tokio::test]
async fn unavailable_lookups_degrade_instead_of_failing() {
    let assessments = MemoryAssessmentLookup::unavailable();
    assert!(assessments.list_by_target(&project("p-1")).await.is_degraded());

    let knowledge = MemoryKnowledgeLookup::unavailable();
    assert!(knowledge.comparisons("p-1").await.is_degraded());
}

#[tokio::test]
async fn surreal_lookups_round_trip() {
    let store = SurrealStore::in_memory().await.unwrap();
    store
        .put_assessment(&assessment("a1", project("p-1"), AssessmentKind::Contextual))
        .await
        .unwrap();
    store
        .put_benchmark("p-1", json!({ "peer": "Acme", "margin": 0.12 }))
        .await
        .unwrap();

    let found = store.list_by_target(&project("p-1")).await.found().unwrap();
    assert_eq!(found[0].assessment_id, "a1");
    assert_eq!(found[0].kind, AssessmentKind::Contextual);

    let comparisons = store.comparisons("p-1").await.found().unwrap();
    assert_eq!(comparisons[0]["peer"], "Acme");
    assert_eq!(store.comparisons("p-2").await, Lookup::Absent);
}
