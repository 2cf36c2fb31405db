//! Stage-gate (Gate 0 / 1 / 2) request and result types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidateError;

/// The three ordered stage gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GateNumber {
    Zero,
    One,
    Two,
}

impl GateNumber {
    pub const ALL: [GateNumber; 3] = [GateNumber::Zero, GateNumber::One, GateNumber::Two];

    pub fn as_u8(self) -> u8 {
        match self {
            GateNumber::Zero => 0,
            GateNumber::One => 1,
            GateNumber::Two => 2,
        }
    }

    /// Code of the upstream deliverable this gate requires.
    pub fn required_artifact(self) -> &'static str {
        match self {
            GateNumber::Zero => "D1",
            GateNumber::One => "D5",
            GateNumber::Two => "D7",
        }
    }

    /// Display name of the required deliverable.
    pub fn artifact_name(self) -> &'static str {
        match self {
            GateNumber::Zero => "Inteligência Fundamental",
            GateNumber::One => "Síntese Estratégica",
            GateNumber::Two => "Roadmap de Execução",
        }
    }

    pub fn gate_name(self) -> &'static str {
        match self {
            GateNumber::Zero => "Gate 0 - Validação de Fundamentos",
            GateNumber::One => "Gate 1 - Validação Estratégica",
            GateNumber::Two => "Gate 2 - Prontidão para Execução",
        }
    }

    /// The gate that precedes this one in the sequence.
    pub fn previous(self) -> Option<GateNumber> {
        match self {
            GateNumber::Zero => None,
            GateNumber::One => Some(GateNumber::Zero),
            GateNumber::Two => Some(GateNumber::One),
        }
    }
}

impl TryFrom<u8> for GateNumber {
    type Error = ValidateError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            0 => Ok(GateNumber::Zero),
            1 => Ok(GateNumber::One),
            2 => Ok(GateNumber::Two),
            other => Err(ValidateError::InvalidRequest(format!(
                "gate_number must be 0, 1 or 2 (got {other})"
            ))),
        }
    }
}

impl From<GateNumber> for u8 {
    fn from(g: GateNumber) -> Self {
        g.as_u8()
    }
}

impl fmt::Display for GateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A deliverable supplied with a stage-gate request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableInput {
    pub code: String,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub confidence_score: Option<f64>,
}

impl DeliverableInput {
    /// Confidence on a 0-100 scale. Values in `[0, 1]` are read as fractions.
    pub fn confidence_percent(&self) -> Option<f64> {
        self.confidence_score.map(normalize_percent)
    }
}

/// Read a score in `[0, 1]` as a fraction and anything above as a percentage.
pub fn normalize_percent(value: f64) -> f64 {
    let pct = if (0.0..=1.0).contains(&value) {
        value * 100.0
    } else {
        value
    };
    pct.clamp(0.0, 100.0)
}

/// Wire-level stage-gate request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageGateRequest {
    pub gate_number: GateNumber,
    pub project_id: String,
    #[serde(default)]
    pub deliverables: Vec<DeliverableInput>,
}

impl StageGateRequest {
    /// The deliverable with the given code, if supplied.
    pub fn deliverable(&self, code: &str) -> Option<&DeliverableInput> {
        self.deliverables.iter().find(|d| d.code == code)
    }
}

/// Outcome of one stage-gate invocation. The latest per gate number is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageGateResult {
    pub gate_number: GateNumber,
    pub passed: bool,
    pub gate_name: String,
    pub score_breakdown: BTreeMap<String, u8>,
    pub overall_score: Option<u8>,
    pub critical_issues: Vec<String>,
    pub blockers: Vec<String>,
    pub warnings: Vec<String>,
    pub required_actions: Vec<String>,
    pub recommendation: String,
    pub evaluated_at: DateTime<Utc>,
}

/// Wire-level stage-gate response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageGateResponse {
    pub success: bool,
    pub gate_number: GateNumber,
    pub result: StageGateResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn gate_number_serializes_as_integer() {
        assert_eq!(serde_json::to_value(GateNumber::One).unwrap(), json!(1));
        let g: GateNumber = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(g, GateNumber::Two);
        assert!(serde_json::from_value::<GateNumber>(json!(3)).is_err());
    }

    #[test]
    fn required_artifacts_follow_gate_order() {
        let codes: Vec<&str> = GateNumber::ALL
            .iter()
            .map(|g| g.required_artifact())
            .collect();
        assert_eq!(codes, vec!["D1", "D5", "D7"]);
        assert_eq!(GateNumber::Two.previous(), Some(GateNumber::One));
        assert_eq!(GateNumber::Zero.previous(), None);
    }

    #[test]
    fn confidence_fraction_is_scaled() {
        assert_eq!(normalize_percent(0.75), 75.0);
        assert_eq!(normalize_percent(85.0), 85.0);
        assert_eq!(normalize_percent(140.0), 100.0);
    }
}
