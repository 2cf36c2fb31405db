//! Structured observability hooks for validation and stage-gate runs.
//!
//! This module provides:
//! - A run-scoped tracing span via `validation_span`
//! - Emission functions for key lifecycle events: start, layer scored,
//!   hard stop raised, degraded lookup, finish, stage-gate evaluation
//!
//! Events are emitted at `info!` level (configurable via `RUST_LOG`).
//! Degraded lookups and persistence failures are emitted at `warn!`.

use tracing::{info, warn};

/// Span covering one validation run, tagged with record id and target.
///
/// Attach it to the run's future with `tracing::Instrument` so every event
/// emitted while the run is polled carries both fields.
///
/// # Example
///
/// ```ignore
/// run.instrument(validation_span("0b9f...", "project/p-1")).await
/// ```
pub fn validation_span(record_id: &str, target: &str) -> tracing::Span {
    tracing::info_span!("stratagate.validation", record_id = %record_id, target = %target)
}

/// Emit event: validation started for a target.
pub fn emit_validation_started(record_id: &str, target: &str, enforce_hard_stops: bool) {
    info!(
        event = "validation.started",
        record_id = %record_id,
        target = %target,
        enforce_hard_stops = enforce_hard_stops,
    );
}

/// Emit event: one layer produced its score.
pub fn emit_layer_scored(layer: &str, score: u8, failed_checks: usize) {
    info!(
        event = "layer.scored",
        layer = %layer,
        score = score,
        failed_checks = failed_checks,
    );
}

/// Emit event: the gate policy engine raised a hard stop or warning.
pub fn emit_hard_stop_raised(gate_id: &str, severity: &str, message: &str) {
    info!(
        event = "hard_stop.raised",
        gate_id = %gate_id,
        severity = %severity,
        message = %message,
    );
}

/// Emit event: an optional collaborator could not answer (warning level).
pub fn emit_lookup_degraded(collaborator: &str, reason: &str) {
    warn!(event = "lookup.degraded", collaborator = %collaborator, reason = %reason);
}

/// Emit event: validation finished with its final status.
pub fn emit_validation_finished(
    record_id: &str,
    status: &str,
    aggregate_score: u8,
    duration_ms: u64,
    checks_performed: u32,
) {
    info!(
        event = "validation.finished",
        record_id = %record_id,
        status = %status,
        aggregate_score = aggregate_score,
        duration_ms = duration_ms,
        checks_performed = checks_performed,
    );
}

/// Emit event: a stage gate was evaluated.
pub fn emit_stage_gate_evaluated(
    project_id: &str,
    gate_number: u8,
    overall_score: Option<u8>,
    passed: bool,
) {
    info!(
        event = "stage_gate.evaluated",
        project_id = %project_id,
        gate_number = gate_number,
        overall_score = overall_score,
        passed = passed,
    );
}

/// Emit event: writing the outcome to the result sink failed (warning level).
pub fn emit_persist_error(record_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "validation.persist_error", record_id = %record_id, error = %error);
}
