//! Gate policy engine.
//!
//! Maps layer and aggregate scores to the four named quality gates and
//! derives the hard-stop list. The gate table and the hard-stop rules are
//! evaluated independently of each other; a failed quality gate never raises
//! a hard stop by itself.

use serde::{Deserialize, Serialize};

use crate::domain::{GateId, GateState, HardStop, LayerName, LayerResult, QualityGateStatus};
use crate::policy::{ThresholdPair, ValidationPolicy};

// ---------------------------------------------------------------------------
// Gate inputs
// ---------------------------------------------------------------------------

/// The scalar signals the gate table and hard-stop rules read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateInputs {
    pub aggregate: u8,
    pub evidence_score: u8,
    pub methodology_adherence: u8,
    pub integrity_score: u8,
    pub consistency_score: u8,
    pub audit_trail: bool,
    pub rbac_degraded: bool,
}

impl GateInputs {
    /// Pull gate signals out of layer results.
    ///
    /// A missing layer reads as score 0; a missing derived field falls back
    /// to the owning layer's score (or `false` for flags).
    pub fn from_layers(layers: &[LayerResult], aggregate: u8) -> Self {
        let find = |name: LayerName| layers.iter().find(|l| l.layer == name);
        let score = |name: LayerName| find(name).map_or(0, |l| l.score);

        let governance = find(LayerName::Governance);
        let integrity = find(LayerName::Integrity);
        let security = find(LayerName::Security);

        Self {
            aggregate,
            evidence_score: score(LayerName::Evidence),
            methodology_adherence: governance
                .and_then(|l| l.derived_u8("methodology_adherence"))
                .unwrap_or_else(|| score(LayerName::Governance)),
            integrity_score: score(LayerName::Integrity),
            consistency_score: integrity
                .and_then(|l| l.derived_u8("consistency_score"))
                .unwrap_or_else(|| score(LayerName::Integrity)),
            audit_trail: security
                .and_then(|l| l.derived_bool("audit_trail"))
                .unwrap_or(false),
            rbac_degraded: security
                .and_then(|l| l.derived_bool("rbac_degraded"))
                .unwrap_or(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Quality-gate table plus hard stops for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub gates: Vec<QualityGateStatus>,
    pub hard_stops: Vec<HardStop>,
}

impl GateVerdict {
    pub fn gate(&self, id: GateId) -> Option<&QualityGateStatus> {
        self.gates.iter().find(|g| g.gate_id == id)
    }

    /// Whether any hard stop (not warning) is unresolved.
    pub fn has_blockers(&self) -> bool {
        self.hard_stops.iter().any(HardStop::is_unresolved_blocker)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluate the gate table and hard-stop rules against `inputs`.
pub fn evaluate_gates(inputs: &GateInputs, policy: &ValidationPolicy) -> GateVerdict {
    let gates = GateId::QUALITY_GATES
        .iter()
        .filter_map(|gate| {
            let pair = policy.gates.for_gate(*gate)?;
            let (score, signal) = gate_signal(*gate, inputs);
            Some(classify(*gate, pair, score, signal))
        })
        .collect();

    GateVerdict {
        gates,
        hard_stops: derive_hard_stops(inputs, policy),
    }
}

fn gate_signal(gate: GateId, inputs: &GateInputs) -> (u8, &'static str) {
    match gate {
        GateId::DataQuality => (inputs.evidence_score, "evidence score"),
        GateId::Methodology => (inputs.methodology_adherence, "methodology adherence"),
        GateId::CrvValidation => (inputs.aggregate, "aggregate score"),
        GateId::IntegrityConsistency => (inputs.consistency_score, "consistency score"),
        GateId::AuditTrail | GateId::AccessControl => (0, "n/a"),
    }
}

fn classify(gate: GateId, pair: ThresholdPair, score: u8, signal: &str) -> QualityGateStatus {
    let (status, details) = if score >= pair.pass {
        (
            GateState::Passed,
            format!("{signal} {score} >= {}", pair.pass),
        )
    } else if score >= pair.warn {
        (
            GateState::Warning,
            format!("{signal} {score} below pass {} (warning floor {})", pair.pass, pair.warn),
        )
    } else {
        (
            GateState::Failed,
            format!("{signal} {score} below warning floor {}", pair.warn),
        )
    };
    QualityGateStatus {
        gate_id: gate,
        status,
        score,
        details,
    }
}

/// Hard stops in a fixed order: evidence, methodology, integrity, then warnings.
pub fn derive_hard_stops(inputs: &GateInputs, policy: &ValidationPolicy) -> Vec<HardStop> {
    let floors = &policy.hard_stops;
    let mut stops = Vec::new();

    if inputs.evidence_score < floors.evidence_min {
        stops.push(HardStop::blocking(
            GateId::DataQuality,
            "critical data quality failure",
            floors.evidence_min,
            inputs.evidence_score,
        ));
    }
    if inputs.methodology_adherence < floors.methodology_adherence_min {
        stops.push(HardStop::blocking(
            GateId::Methodology,
            "methodology adherence below threshold",
            floors.methodology_adherence_min,
            inputs.methodology_adherence,
        ));
    }
    if inputs.integrity_score < floors.integrity_min {
        stops.push(HardStop::blocking(
            GateId::IntegrityConsistency,
            "integrity validation failed",
            floors.integrity_min,
            inputs.integrity_score,
        ));
    }
    if !inputs.audit_trail {
        stops.push(HardStop::warning(GateId::AuditTrail, "audit trail incomplete"));
    }
    if inputs.rbac_degraded {
        stops.push(HardStop::warning(
            GateId::AccessControl,
            "permission check unavailable; access defaulted to allow",
        ));
    }
    stops
}
