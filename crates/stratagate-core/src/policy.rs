//! Weight and threshold tables injected into the validation engine.
//!
//! [`ValidationPolicy::default`] is the production table. Alternate policies
//! can be loaded from JSON (partial documents override only the keys they
//! name) and must pass [`ValidationPolicy::validate`] before use.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{EntitySnapshot, GateId, LayerName, Result, ValidateError};

/// Per-layer aggregation weights in percentage points.
///
/// # Invariants
///
/// The five weights sum to exactly 100 (i.e. 1.0), checked by `validate`.
/// Integer points keep the sum exact and aggregation deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerWeights {
    pub authenticity: u32,
    pub evidence: u32,
    pub governance: u32,
    pub integrity: u32,
    pub security: u32,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self {
            authenticity: 25,
            evidence: 20,
            governance: 25,
            integrity: 20,
            security: 10,
        }
    }
}

impl LayerWeights {
    pub fn points(&self, layer: LayerName) -> u32 {
        match layer {
            LayerName::Authenticity => self.authenticity,
            LayerName::Evidence => self.evidence,
            LayerName::Governance => self.governance,
            LayerName::Integrity => self.integrity,
            LayerName::Security => self.security,
        }
    }

    /// Weight as a fraction of 1.0.
    pub fn fraction(&self, layer: LayerName) -> f64 {
        f64::from(self.points(layer)) / 100.0
    }

    /// Sum of all points, widened so oversized weights cannot wrap.
    pub fn total(&self) -> u64 {
        LayerName::ALL
            .iter()
            .map(|l| u64::from(self.points(*l)))
            .sum()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(layer) = LayerName::ALL.iter().find(|l| self.points(**l) > 100) {
            return Err(ValidateError::InvalidPolicy(format!(
                "{layer} weight {} exceeds 100 points",
                self.points(*layer)
            )));
        }
        let total = self.total();
        if total != 100 {
            return Err(ValidateError::InvalidPolicy(format!(
                "layer weights must sum to 100 points (1.0), got {total}"
            )));
        }
        Ok(())
    }
}

/// Pass / warning boundaries for one quality gate. Below `warn` is failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub pass: u8,
    pub warn: u8,
}

impl ThresholdPair {
    pub const fn new(pass: u8, warn: u8) -> Self {
        Self { pass, warn }
    }
}

/// Boundaries for the four named quality gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateThresholds {
    pub data_quality: ThresholdPair,
    pub methodology: ThresholdPair,
    pub crv_validation: ThresholdPair,
    pub integrity_consistency: ThresholdPair,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            data_quality: ThresholdPair::new(70, 50),
            methodology: ThresholdPair::new(80, 60),
            crv_validation: ThresholdPair::new(75, 60),
            integrity_consistency: ThresholdPair::new(85, 70),
        }
    }
}

impl GateThresholds {
    pub fn for_gate(&self, gate: GateId) -> Option<ThresholdPair> {
        match gate {
            GateId::DataQuality => Some(self.data_quality),
            GateId::Methodology => Some(self.methodology),
            GateId::CrvValidation => Some(self.crv_validation),
            GateId::IntegrityConsistency => Some(self.integrity_consistency),
            GateId::AuditTrail | GateId::AccessControl => None,
        }
    }
}

/// Floors below which a hard stop is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardStopThresholds {
    pub evidence_min: u8,
    pub methodology_adherence_min: u8,
    pub integrity_min: u8,
}

impl Default for HardStopThresholds {
    fn default() -> Self {
        Self {
            evidence_min: 50,
            methodology_adherence_min: 60,
            integrity_min: 60,
        }
    }
}

/// Complete weight and threshold policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    pub weights: LayerWeights,
    pub gates: GateThresholds,
    pub hard_stops: HardStopThresholds,
    /// Fields the integrity layer requires; each missing one costs 10 points.
    pub critical_fields: Vec<String>,
    /// Action name sent to the permission collaborator.
    pub permission_action: String,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            weights: LayerWeights::default(),
            gates: GateThresholds::default(),
            hard_stops: HardStopThresholds::default(),
            critical_fields: vec!["title".to_string(), "status".to_string()],
            permission_action: "validate".to_string(),
        }
    }
}

impl ValidationPolicy {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)
            .map_err(|e| ValidateError::InvalidPolicy(format!("unparseable policy: {e}")))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ValidateError::InvalidPolicy(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// `InvalidPolicy` when weights do not sum to 1.0, a gate's pass boundary
    /// is below its warning boundary or above 100, or a critical field name
    /// is not one the snapshot exposes.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        for gate in GateId::QUALITY_GATES {
            if let Some(pair) = self.gates.for_gate(gate) {
                if pair.pass > 100 || pair.warn > pair.pass {
                    return Err(ValidateError::InvalidPolicy(format!(
                        "gate {gate}: need warn <= pass <= 100, got warn={} pass={}",
                        pair.warn, pair.pass
                    )));
                }
            }
        }

        for field in &self.critical_fields {
            if !EntitySnapshot::KNOWN_FIELDS.contains(&field.as_str()) {
                return Err(ValidateError::InvalidPolicy(format!(
                    "unknown critical field: {field}"
                )));
            }
        }

        if self.permission_action.trim().is_empty() {
            return Err(ValidateError::InvalidPolicy(
                "permission_action must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Engine configuration: policy plus collaborator time bounds.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub policy: ValidationPolicy,
    /// Upper bound on the permission check; elapsed means unavailable.
    pub permission_timeout: Duration,
    /// Upper bound on optional assessment lookups; elapsed means degraded.
    pub lookup_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::default(),
            permission_timeout: Duration::from_secs(5),
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_permission_timeout(mut self, timeout: Duration) -> Self {
        self.permission_timeout = timeout;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }
}
