//! Stratagate Core Library
//!
//! Scores strategic artifacts (projects, strategies, analyses, deliverables)
//! across five independent layers, aggregates the scores, derives quality
//! gates and hard stops, and decides passed / failed / blocked. A separate
//! stage-gate evaluator judges Gate 0/1/2 artifacts through an external
//! collaborator and owns the pass thresholds.

pub mod aggregate;
pub mod decision;
pub mod domain;
pub mod gates;
pub mod layers;
pub mod loader;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod policy;
pub mod remote;
pub mod reporting;
pub mod stage_gate;
pub mod telemetry;

pub use domain::{
    BlockedRejection, DataSource, DeliverableInput, DeliverableRef, Diagnostic, EntitySnapshot,
    GateId, GateNumber, GateState, HardStop, HardStopSeverity, LayerName, LayerResult, Milestone,
    QualityGateStatus, Result, Severity, StageGateRequest, StageGateResponse, StageGateResult,
    ValidateError, ValidationRecord, ValidationRequest, ValidationResponse, ValidationStatus,
    ValidationTarget,
};

pub use aggregate::aggregate;
pub use decision::{decide, resolution_checklist};
pub use gates::{evaluate_gates, GateInputs, GateVerdict};
pub use loader::{snapshot_from_fields, SnapshotLoader};
pub use pipeline::ValidationEngine;
pub use policy::{
    EngineConfig, GateThresholds, HardStopThresholds, LayerWeights, ThresholdPair,
    ValidationPolicy,
};
pub use remote::{HttpJudge, HttpPermissionCheck, NoPermissionService};
pub use stage_gate::{
    JudgeError, Judgment, JudgmentClient, JudgmentRequest, Rubric, ScriptedJudge,
    StageGateConfig, StageGateEvaluator,
};
pub use telemetry::init_tracing;
