//! Governance layer: methodology adherence and independent assessments.
//!
//! `methodology_adherence` starts at 100 and loses points for each missing
//! governance artefact. The layer score is
//! `round(adherence * 0.7) + 15 * has_cross_validation + 15 * has_contextual`,
//! clamped to `[0, 100]`. Assessment lookups are optional: a degraded or
//! absent answer counts as "not found".

use stratagate_store::{AssessmentKind, AssessmentRecord, Lookup};

use crate::domain::{clamp_score, Diagnostic, EntitySnapshot, LayerName, LayerResult, Severity};

use super::BASELINE;

pub const NO_CROSS_VALIDATION_DEDUCTION: u32 = 15;
pub const NO_CONTEXTUAL_DEDUCTION: u32 = 15;
pub const NO_CONFIDENCE_DEDUCTION: u32 = 20;
pub const NO_QUALITY_GATE_STATE_DEDUCTION: u32 = 10;
pub const ASSESSMENT_BONUS: i64 = 15;

/// Whether the target (or one of its deliverables) declares a confidence score.
fn has_confidence(snapshot: &EntitySnapshot) -> bool {
    snapshot.confidence_score.is_some()
        || snapshot
            .deliverables
            .iter()
            .any(|d| d.confidence_score.is_some())
}

pub fn evaluate(
    snapshot: &EntitySnapshot,
    assessments: &Lookup<Vec<AssessmentRecord>>,
) -> LayerResult {
    let degraded = assessments.is_degraded();
    let (has_cv, has_ca) = match assessments {
        Lookup::Found(list) => (
            list.iter().any(|a| a.kind == AssessmentKind::CrossValidation),
            list.iter().any(|a| a.kind == AssessmentKind::Contextual),
        ),
        Lookup::Absent | Lookup::Degraded { .. } => (false, false),
    };
    let lookup_note = if degraded { " (lookup degraded)" } else { "" };

    // Deductions here apply to methodology_adherence, not to the layer score.
    let mut diagnostics = Vec::with_capacity(4);
    diagnostics.push(if has_cv {
        Diagnostic::pass("cross_validation", "linked cross-validation analysis found")
    } else {
        Diagnostic::fail(
            "cross_validation",
            Severity::Medium,
            NO_CROSS_VALIDATION_DEDUCTION,
            format!("no linked cross-validation analysis{lookup_note}"),
        )
    });
    diagnostics.push(if has_ca {
        Diagnostic::pass("contextual_assessment", "contextual assessment found")
    } else {
        Diagnostic::fail(
            "contextual_assessment",
            Severity::Medium,
            NO_CONTEXTUAL_DEDUCTION,
            format!("no contextual or compliance assessment{lookup_note}"),
        )
    });
    diagnostics.push(if has_confidence(snapshot) {
        Diagnostic::pass("confidence_score", "confidence score present")
    } else {
        Diagnostic::fail(
            "confidence_score",
            Severity::Medium,
            NO_CONFIDENCE_DEDUCTION,
            "no confidence or CRV score on the target",
        )
    });
    diagnostics.push(if snapshot.has_quality_gate_state {
        Diagnostic::pass("quality_gate_state", "quality-gate state present")
    } else {
        Diagnostic::fail(
            "quality_gate_state",
            Severity::Low,
            NO_QUALITY_GATE_STATE_DEDUCTION,
            "no quality-gate state recorded",
        )
    });

    let deducted: i64 = diagnostics.iter().map(|d| i64::from(d.deduction)).sum();
    let adherence = clamp_score(BASELINE - deducted);
    // round(adherence * 0.7), half away from zero, in integer arithmetic.
    let weighted = (i64::from(adherence) * 7 + 5) / 10;
    let score = weighted
        + ASSESSMENT_BONUS * i64::from(has_cv)
        + ASSESSMENT_BONUS * i64::from(has_ca);

    LayerResult::with_score(LayerName::Governance, score, diagnostics)
        .derive("methodology_adherence", adherence)
        .derive("has_cross_validation", has_cv)
        .derive("has_contextual_assessment", has_ca)
        .derive("assessments_degraded", degraded)
}
