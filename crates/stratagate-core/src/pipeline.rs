//! Validation pipeline.
//!
//! Loader → five layers (concurrently) → aggregator → gate policy engine →
//! decision engine → result sink. Persistence is the only write and happens
//! once, after every score is known; a run dropped before that point leaves
//! nothing behind.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use stratagate_store::{
    AssessmentLookup, EntityStore, PermissionCheck, PermissionQuery, ResultSink, StoredValidation,
    TargetRef,
};
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::decision::{decide, resolution_checklist};
use crate::domain::{
    BlockedRejection, EntitySnapshot, LayerResult, Result, ValidateError, ValidationRecord,
    ValidationRequest, ValidationStatus, ValidationTarget,
};
use crate::gates::{evaluate_gates, GateInputs};
use crate::layers::{
    authenticity, check_permission, evidence, fetch_assessments, governance, integrity, security,
};
use crate::loader::SnapshotLoader;
use crate::metrics::{Counter, METRICS};
use crate::obs;
use crate::policy::EngineConfig;

/// Runs validations against a fixed set of collaborators and an immutable policy.
#[derive(Clone)]
pub struct ValidationEngine {
    loader: SnapshotLoader,
    assessments: Arc<dyn AssessmentLookup>,
    permissions: Arc<dyn PermissionCheck>,
    sink: Arc<dyn ResultSink>,
    config: Arc<EngineConfig>,
}

impl ValidationEngine {
    /// Build an engine. Fails with `InvalidPolicy` if the policy is inconsistent.
    pub fn new(
        entities: Arc<dyn EntityStore>,
        assessments: Arc<dyn AssessmentLookup>,
        permissions: Arc<dyn PermissionCheck>,
        sink: Arc<dyn ResultSink>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.policy.validate()?;
        Ok(Self {
            loader: SnapshotLoader::new(entities),
            assessments,
            permissions,
            sink,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate one target and persist the outcome.
    ///
    /// Returns the record for `passed` and `failed` outcomes. A `blocked`
    /// outcome is persisted too, then returned as
    /// [`ValidateError::Blocked`] carrying the unresolved hard stops and a
    /// resolution checklist.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for a malformed request or target payload.
    /// - `NotFound` when a by-id target does not exist.
    /// - `Storage` when loading or persisting fails.
    /// - `Blocked` as described above.
    pub async fn validate(&self, request: &ValidationRequest) -> Result<ValidationRecord> {
        let target = request.target()?;
        let record_id = Uuid::new_v4();
        let span = obs::validation_span(&record_id.to_string(), &target.target_ref().to_string());
        self.run(request, &target, record_id).instrument(span).await
    }

    async fn run(
        &self,
        request: &ValidationRequest,
        target: &ValidationTarget,
        record_id: Uuid,
    ) -> Result<ValidationRecord> {
        obs::emit_validation_started(
            &record_id.to_string(),
            &target.target_ref().to_string(),
            request.enforce_hard_stops,
        );
        METRICS.incr(Counter::ValidationsRun);

        let started = Instant::now();
        let snapshot = self.loader.load(target).await?;
        let mut record = self
            .evaluate_snapshot(&snapshot, request.actor(), request.enforce_hard_stops)
            .await;
        record.record_id = record_id;
        record.duration_ms = started.elapsed().as_millis() as u64;

        self.persist(&record).await?;

        obs::emit_validation_finished(
            &record_id.to_string(),
            record.status.as_str(),
            record.aggregate_score,
            record.duration_ms,
            record.checks_performed,
        );

        if record.status == ValidationStatus::Blocked {
            METRICS.incr(Counter::ValidationsBlocked);
            return Err(ValidateError::Blocked(Box::new(BlockedRejection {
                record_id: record.record_id,
                target: record.target.clone(),
                aggregate_score: record.aggregate_score,
                hard_stops: record
                    .unresolved_hard_stops()
                    .into_iter()
                    .cloned()
                    .collect(),
                resolution_checklist: resolution_checklist(&record.hard_stops),
            })));
        }
        Ok(record)
    }

    /// Score a snapshot without persisting anything.
    ///
    /// The returned record has a fresh id and zero duration; `validate`
    /// overwrites both.
    pub async fn evaluate_snapshot(
        &self,
        snapshot: &EntitySnapshot,
        actor: &str,
        enforce_hard_stops: bool,
    ) -> ValidationRecord {
        let policy = &self.config.policy;
        let layers = self.run_layers(snapshot, actor).await;
        for layer in &layers {
            obs::emit_layer_scored(layer.layer.as_str(), layer.score, layer.failed_checks().len());
        }

        let aggregate_score = aggregate(&layers, &policy.weights);
        let verdict = evaluate_gates(&GateInputs::from_layers(&layers, aggregate_score), policy);
        for stop in &verdict.hard_stops {
            obs::emit_hard_stop_raised(
                stop.gate_id.as_str(),
                stop.severity.as_str(),
                &stop.message,
            );
        }
        METRICS.add(Counter::HardStopsRaised, verdict.hard_stops.len() as u64);

        let status = decide(&verdict.hard_stops, enforce_hard_stops);
        let checks_performed = layers.iter().map(|l| l.diagnostics.len() as u32).sum();

        ValidationRecord {
            record_id: Uuid::new_v4(),
            target: snapshot.target.clone(),
            layers,
            aggregate_score,
            hard_stops: verdict.hard_stops,
            gates: verdict.gates,
            status,
            enforce_hard_stops,
            duration_ms: 0,
            checks_performed,
            created_at: Utc::now(),
        }
    }

    /// Run the five evaluators concurrently and return them in reporting order.
    async fn run_layers(&self, snapshot: &EntitySnapshot, actor: &str) -> Vec<LayerResult> {
        let policy = &self.config.policy;
        let query = PermissionQuery {
            actor: actor.to_string(),
            target: snapshot.target.clone(),
            action: policy.permission_action.clone(),
        };

        let (authenticity, evidence, governance, integrity, security) = tokio::join!(
            async { authenticity::evaluate(snapshot) },
            async { evidence::evaluate(snapshot) },
            async {
                let found = fetch_assessments(
                    self.assessments.as_ref(),
                    &snapshot.target,
                    self.config.lookup_timeout,
                )
                .await;
                governance::evaluate(snapshot, &found)
            },
            async { integrity::evaluate(snapshot, &policy.critical_fields) },
            async {
                let decision = check_permission(
                    self.permissions.as_ref(),
                    &query,
                    self.config.permission_timeout,
                )
                .await;
                security::evaluate(snapshot, &decision)
            },
        );
        vec![authenticity, evidence, governance, integrity, security]
    }

    async fn persist(&self, record: &ValidationRecord) -> Result<()> {
        let stored = StoredValidation {
            record_id: record.record_id.to_string(),
            target: record.target.clone(),
            status: record.status.as_str().to_string(),
            aggregate_score: record.aggregate_score,
            digest: record.content_digest(),
            payload: serde_json::to_value(record)?,
            created_at: record.created_at,
        };
        if let Err(e) = self.sink.append_validation(stored).await {
            obs::emit_persist_error(&record.record_id.to_string(), &e);
            return Err(e.into());
        }
        debug!(record_id = %record.record_id, "validation persisted");
        Ok(())
    }

    /// Stored records for a target, newest first, decoded back into records.
    pub async fn history(&self, target: &TargetRef) -> Result<Vec<ValidationRecord>> {
        let stored = self.sink.list_validations(target).await?;
        stored
            .into_iter()
            .map(|s| serde_json::from_value(s.payload).map_err(ValidateError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratagate_store::fakes::{
        MemoryAssessmentLookup, MemoryEntityStore, MemoryResultSink, StaticPermissionCheck,
    };
    use stratagate_store::EntityKind;

    fn engine(sink: Arc<MemoryResultSink>) -> ValidationEngine {
        ValidationEngine::new(
            Arc::new(MemoryEntityStore::new()),
            Arc::new(MemoryAssessmentLookup::new()),
            Arc::new(StaticPermissionCheck::allow()),
            sink,
            EngineConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn record_has_five_layers_in_order() {
        let sink = Arc::new(MemoryResultSink::new());
        let request = ValidationRequest::inline(EntityKind::Project, json!({ "name": "x" }));
        let record = engine(sink.clone()).validate(&request).await.unwrap();
        let names: Vec<_> = record.layers.iter().map(|l| l.layer).collect();
        assert_eq!(names, crate::domain::LayerName::ALL.to_vec());
        assert_eq!(
            record.checks_performed as usize,
            record.layers.iter().map(|l| l.diagnostics.len()).sum::<usize>()
        );
        assert_eq!(sink.validation_count(), 1);
    }

    #[tokio::test]
    async fn invalid_request_persists_nothing() {
        let sink = Arc::new(MemoryResultSink::new());
        let request = ValidationRequest::by_id(EntityKind::Project, "");
        let err = engine(sink.clone()).validate(&request).await.unwrap_err();
        assert!(matches!(err, ValidateError::InvalidRequest(_)));
        assert_eq!(sink.validation_count(), 0);
    }

    #[tokio::test]
    async fn inconsistent_policy_is_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.policy.weights.evidence = 0;
        let result = ValidationEngine::new(
            Arc::new(MemoryEntityStore::new()),
            Arc::new(MemoryAssessmentLookup::new()),
            Arc::new(StaticPermissionCheck::allow()),
            Arc::new(MemoryResultSink::new()),
            config,
        );
        assert!(matches!(result, Err(ValidateError::InvalidPolicy(_))));
    }
}
