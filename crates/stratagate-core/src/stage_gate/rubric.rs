//! Rubrics and the structured request sent to the judgment collaborator.

use serde::{Deserialize, Serialize};

use crate::domain::GateNumber;

/// One named, weighted criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    /// Weight in percentage points; a rubric's weights sum to 100.
    pub weight: u8,
    pub description: String,
}

impl Criterion {
    fn new(name: &str, weight: u8, description: &str) -> Self {
        Self {
            name: name.to_string(),
            weight,
            description: description.to_string(),
        }
    }
}

/// The criteria a gate is judged on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    pub gate_number: GateNumber,
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    pub fn for_gate(gate: GateNumber) -> Self {
        let criteria = match gate {
            GateNumber::Zero => vec![
                Criterion::new(
                    "data_completeness",
                    30,
                    "Foundational data covers market, customers and competitors",
                ),
                Criterion::new(
                    "source_quality",
                    25,
                    "Sources are identified, current and of high tier",
                ),
                Criterion::new(
                    "market_clarity",
                    25,
                    "Market size and segments are stated unambiguously",
                ),
                Criterion::new(
                    "feasibility",
                    20,
                    "Initial constraints and feasibility signals are assessed",
                ),
            ],
            GateNumber::One => vec![
                Criterion::new(
                    "strategic_clarity",
                    25,
                    "Strategic choices and positioning are explicit",
                ),
                Criterion::new(
                    "data_confidence",
                    25,
                    "Conclusions are backed by validated evidence",
                ),
                Criterion::new(
                    "actionability",
                    25,
                    "Recommendations translate into concrete initiatives",
                ),
                Criterion::new(
                    "risk_assessment",
                    25,
                    "Key risks are identified with likelihood and impact",
                ),
            ],
            GateNumber::Two => vec![
                Criterion::new(
                    "execution_feasibility",
                    30,
                    "Roadmap is achievable with the stated timeline",
                ),
                Criterion::new(
                    "resource_alignment",
                    25,
                    "Budget, people and ownership match the roadmap",
                ),
                Criterion::new(
                    "risk_mitigation",
                    25,
                    "Every critical risk has a mitigation and an owner",
                ),
                Criterion::new(
                    "measurability",
                    20,
                    "Milestones carry measurable success indicators",
                ),
            ],
        };
        Self {
            gate_number: gate,
            criteria,
        }
    }

    pub fn criterion_names(&self) -> impl Iterator<Item = &str> {
        self.criteria.iter().map(|c| c.name.as_str())
    }

    pub fn total_weight(&self) -> u32 {
        self.criteria.iter().map(|c| u32::from(c.weight)).sum()
    }
}

/// Structured request handed to the judgment collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentRequest {
    pub project_id: String,
    pub gate_number: GateNumber,
    pub gate_name: String,
    pub artifact_code: String,
    pub artifact_name: String,
    pub artifact: serde_json::Value,
    /// Declared confidence of the artifact on a 0-100 scale.
    pub confidence_score: Option<f64>,
    pub rubric: Rubric,
    /// Comparison entries (Gate 1 only); empty when the lookup degraded.
    pub comparisons: Vec<serde_json::Value>,
}
