//! Authenticity layer: who made the target, when, and from what.

use crate::domain::{Diagnostic, EntitySnapshot, LayerName, LayerResult, Severity};

use super::BASELINE;

pub const CREATOR_DEDUCTION: u32 = 15;
pub const TEMPORAL_DEDUCTION: u32 = 25;
pub const PROVENANCE_DEDUCTION: u32 = 20;

pub fn evaluate(snapshot: &EntitySnapshot) -> LayerResult {
    let mut diagnostics = Vec::with_capacity(3);

    let has_creator = snapshot.has_field("created_by");
    diagnostics.push(if has_creator {
        Diagnostic::pass("creator_identity", "creator recorded")
    } else {
        Diagnostic::fail(
            "creator_identity",
            Severity::Medium,
            CREATOR_DEDUCTION,
            "creator identity is missing",
        )
    });

    // Only checkable when both timestamps exist.
    let temporally_coherent = match (snapshot.created_at, snapshot.updated_at) {
        (Some(created), Some(updated)) => updated >= created,
        _ => true,
    };
    diagnostics.push(if temporally_coherent {
        Diagnostic::pass("temporal_coherence", "timestamps are ordered")
    } else {
        Diagnostic::fail(
            "temporal_coherence",
            Severity::High,
            TEMPORAL_DEDUCTION,
            "updated_at is earlier than created_at",
        )
    });

    let has_provenance = !snapshot.data_sources.is_empty()
        || !snapshot.referenced_documents.is_empty()
        || snapshot.has_analysis_results;
    diagnostics.push(if has_provenance {
        Diagnostic::pass("provenance_marker", "provenance marker present")
    } else {
        Diagnostic::fail(
            "provenance_marker",
            Severity::Medium,
            PROVENANCE_DEDUCTION,
            "no data sources, referenced documents or analysis results",
        )
    });

    LayerResult::from_deductions(LayerName::Authenticity, BASELINE, diagnostics)
        .derive("has_creator", has_creator)
        .derive("temporally_coherent", temporally_coherent)
        .derive("has_provenance", has_provenance)
}
