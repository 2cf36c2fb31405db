//! Quality gates, hard stops and the persisted validation record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stratagate_store::{ContentDigest, TargetRef};
use uuid::Uuid;

use super::layer::{LayerName, LayerResult};

/// Identifiers for quality gates and hard-stop sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateId {
    DataQuality,
    Methodology,
    CrvValidation,
    IntegrityConsistency,
    AuditTrail,
    AccessControl,
}

impl GateId {
    /// The four named quality gates, in reporting order.
    pub const QUALITY_GATES: [GateId; 4] = [
        GateId::DataQuality,
        GateId::Methodology,
        GateId::CrvValidation,
        GateId::IntegrityConsistency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GateId::DataQuality => "data_quality",
            GateId::Methodology => "methodology",
            GateId::CrvValidation => "crv_validation",
            GateId::IntegrityConsistency => "integrity_consistency",
            GateId::AuditTrail => "audit_trail",
            GateId::AccessControl => "access_control",
        }
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardStopSeverity {
    HardStop,
    Warning,
}

impl HardStopSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            HardStopSeverity::HardStop => "hard_stop",
            HardStopSeverity::Warning => "warning",
        }
    }
}

/// A rule violation emitted by the gate policy engine.
///
/// Immutable once emitted within a run; resolution happens by re-submitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardStop {
    pub gate_id: GateId,
    pub severity: HardStopSeverity,
    pub message: String,
    /// Minimum acceptable value, when the stop is threshold-based.
    pub threshold: Option<u8>,
    /// Value observed in this run.
    pub observed: Option<u8>,
    pub resolution_required: bool,
    pub resolved: bool,
}

impl HardStop {
    pub fn blocking(gate_id: GateId, message: &str, threshold: u8, observed: u8) -> Self {
        Self {
            gate_id,
            severity: HardStopSeverity::HardStop,
            message: message.to_string(),
            threshold: Some(threshold),
            observed: Some(observed),
            resolution_required: true,
            resolved: false,
        }
    }

    pub fn warning(gate_id: GateId, message: &str) -> Self {
        Self {
            gate_id,
            severity: HardStopSeverity::Warning,
            message: message.to_string(),
            threshold: None,
            observed: None,
            resolution_required: false,
            resolved: false,
        }
    }

    /// Counts toward blocked/failed status.
    pub fn is_unresolved_blocker(&self) -> bool {
        self.severity == HardStopSeverity::HardStop && !self.resolved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Passed,
    Warning,
    Failed,
}

/// Status of one named quality gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityGateStatus {
    pub gate_id: GateId,
    pub status: GateState,
    pub score: u8,
    pub details: String,
}

/// Final decision for a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Failed,
    Blocked,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Passed => "passed",
            ValidationStatus::Failed => "failed",
            ValidationStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full outcome of one validation run. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub record_id: Uuid,
    pub target: TargetRef,
    pub layers: Vec<LayerResult>,
    pub aggregate_score: u8,
    pub hard_stops: Vec<HardStop>,
    pub gates: Vec<QualityGateStatus>,
    pub status: ValidationStatus,
    pub enforce_hard_stops: bool,
    pub duration_ms: u64,
    pub checks_performed: u32,
    pub created_at: DateTime<Utc>,
}

/// Timestamp-free view hashed by [`ValidationRecord::content_digest`].
#[derive(Serialize)]
struct DigestView<'a> {
    target: &'a TargetRef,
    layers: &'a [LayerResult],
    aggregate_score: u8,
    hard_stops: &'a [HardStop],
    gates: &'a [QualityGateStatus],
    status: ValidationStatus,
}

impl ValidationRecord {
    pub fn layer(&self, name: LayerName) -> Option<&LayerResult> {
        self.layers.iter().find(|l| l.layer == name)
    }

    pub fn unresolved_hard_stops(&self) -> Vec<&HardStop> {
        self.hard_stops
            .iter()
            .filter(|h| h.is_unresolved_blocker())
            .collect()
    }

    pub fn warnings(&self) -> Vec<&HardStop> {
        self.hard_stops
            .iter()
            .filter(|h| h.severity == HardStopSeverity::Warning)
            .collect()
    }

    /// SHA-256 over the record content excluding id, timing and timestamps.
    ///
    /// Two runs over identical snapshots and identical collaborator answers
    /// produce equal digests.
    pub fn content_digest(&self) -> ContentDigest {
        let view = DigestView {
            target: &self.target,
            layers: &self.layers,
            aggregate_score: self.aggregate_score,
            hard_stops: &self.hard_stops,
            gates: &self.gates,
            status: self.status,
        };
        // Serializing plain data structs into a Vec cannot fail.
        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        ContentDigest::from_bytes(&bytes)
    }
}

/// Structured rejection returned for a `blocked` outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedRejection {
    pub record_id: Uuid,
    pub target: TargetRef,
    pub aggregate_score: u8,
    /// Unresolved hard stops only.
    pub hard_stops: Vec<HardStop>,
    /// One actionable line per unresolved hard stop.
    pub resolution_checklist: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratagate_store::EntityKind;

    fn record(status: ValidationStatus, hard_stops: Vec<HardStop>) -> ValidationRecord {
        ValidationRecord {
            record_id: Uuid::new_v4(),
            target: TargetRef::new(EntityKind::Strategy, "s-1"),
            layers: vec![],
            aggregate_score: 70,
            hard_stops,
            gates: vec![],
            status,
            enforce_hard_stops: false,
            duration_ms: 3,
            checks_performed: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn digest_ignores_id_and_timing() {
        let a = record(ValidationStatus::Passed, vec![]);
        let mut b = a.clone();
        b.record_id = Uuid::new_v4();
        b.duration_ms = 999;
        b.created_at = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(a.content_digest(), b.content_digest());

        b.aggregate_score = 71;
        assert_ne!(a.content_digest(), b.content_digest());
    }

    #[test]
    fn warnings_are_not_unresolved_blockers() {
        let r = record(
            ValidationStatus::Failed,
            vec![
                HardStop::warning(GateId::AuditTrail, "audit trail incomplete"),
                HardStop::blocking(GateId::Methodology, "m", 60, 50),
            ],
        );
        assert_eq!(r.unresolved_hard_stops().len(), 1);
        assert_eq!(r.warnings().len(), 1);
    }

    #[test]
    fn gate_id_serializes_snake_case() {
        let json = serde_json::to_string(&GateId::IntegrityConsistency).unwrap();
        assert_eq!(json, "\"integrity_consistency\"");
    }
}
