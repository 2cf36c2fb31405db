//! Judgment collaborator contract.
//!
//! The collaborator scores an artifact against a rubric. Its output is
//! checked here for shape only; the stage-gate evaluator owns the pass rule.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::rubric::{JudgmentRequest, Rubric};

/// Errors from a judgment collaborator.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("judge responded with HTTP {0}")]
    Status(u16),

    #[error("malformed judgment: {0}")]
    Malformed(String),
}

/// Raw judgment as returned by the collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub score_breakdown: BTreeMap<String, f64>,
    pub overall_score: f64,
    /// The collaborator's own verdict. Recorded, never trusted.
    pub passed: bool,
    #[serde(default)]
    pub critical_issues: Vec<String>,
    #[serde(default)]
    pub blockers: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub required_actions: Vec<String>,
    #[serde(default)]
    pub unmitigated_critical_risks: Vec<String>,
    #[serde(default)]
    pub recommendation: String,
}

/// A judgment whose scores have been checked and rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedJudgment {
    pub score_breakdown: BTreeMap<String, u8>,
    pub overall_score: u8,
    pub judgment: Judgment,
}

fn checked_score(label: &str, value: f64) -> Result<u8, JudgeError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(JudgeError::Malformed(format!(
            "{label} must be within 0-100, got {value}"
        )));
    }
    Ok(value.round() as u8)
}

impl Judgment {
    /// Check every rubric criterion is scored and every score is in range.
    ///
    /// Scores for criteria outside the rubric are dropped.
    pub fn check_against(self, rubric: &Rubric) -> Result<CheckedJudgment, JudgeError> {
        let mut breakdown = BTreeMap::new();
        for name in rubric.criterion_names() {
            let value = self
                .score_breakdown
                .get(name)
                .copied()
                .ok_or_else(|| JudgeError::Malformed(format!("missing criterion {name}")))?;
            breakdown.insert(name.to_string(), checked_score(name, value)?);
        }
        let overall_score = checked_score("overall_score", self.overall_score)?;
        Ok(CheckedJudgment {
            score_breakdown: breakdown,
            overall_score,
            judgment: self,
        })
    }
}

/// External judgment collaborator.
#[async_trait]
pub trait JudgmentClient: Send + Sync {
    async fn judge(&self, request: &JudgmentRequest) -> Result<Judgment, JudgeError>;
}

// ---------------------------------------------------------------------------
// ScriptedJudge
// ---------------------------------------------------------------------------

/// Judge that replays a fixed answer and records every request.
#[derive(Debug)]
pub struct ScriptedJudge {
    answer: Result<Judgment, String>,
    requests: Mutex<Vec<JudgmentRequest>>,
    calls: AtomicUsize,
}

impl ScriptedJudge {
    pub fn returning(judgment: Judgment) -> Self {
        Self {
            answer: Ok(judgment),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A judge that always fails with a transport error.
    pub fn failing(reason: &str) -> Self {
        Self {
            answer: Err(reason.to_string()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A judgment scoring every criterion of `rubric` at `score`.
    pub fn uniform(rubric: &Rubric, score: f64) -> Judgment {
        Judgment {
            score_breakdown: rubric
                .criterion_names()
                .map(|n| (n.to_string(), score))
                .collect(),
            overall_score: score,
            passed: true,
            critical_issues: Vec::new(),
            blockers: Vec::new(),
            warnings: Vec::new(),
            required_actions: Vec::new(),
            unmitigated_critical_risks: Vec::new(),
            recommendation: String::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<JudgmentRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl JudgmentClient for ScriptedJudge {
    async fn judge(&self, request: &JudgmentRequest) -> Result<Judgment, JudgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.answer.clone().map_err(JudgeError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GateNumber;

    #[test]
    fn missing_criterion_is_malformed() {
        let rubric = Rubric::for_gate(GateNumber::One);
        let mut judgment = ScriptedJudge::uniform(&rubric, 80.0);
        judgment.score_breakdown.remove("actionability");
        let err = judgment.check_against(&rubric).unwrap_err();
        assert!(err.to_string().contains("actionability"));
    }

    #[test]
    fn out_of_range_score_is_malformed() {
        let rubric = Rubric::for_gate(GateNumber::Zero);
        let mut judgment = ScriptedJudge::uniform(&rubric, 80.0);
        judgment.overall_score = 140.0;
        assert!(matches!(
            judgment.check_against(&rubric),
            Err(JudgeError::Malformed(_))
        ));
    }

    #[test]
    fn scores_are_rounded_and_extras_dropped() {
        let rubric = Rubric::for_gate(GateNumber::Two);
        let mut judgment = ScriptedJudge::uniform(&rubric, 77.6);
        judgment.score_breakdown.insert("vibes".into(), 10.0);
        let checked = judgment.check_against(&rubric).unwrap();
        assert_eq!(checked.overall_score, 78);
        assert_eq!(checked.score_breakdown.len(), 4);
        assert!(!checked.score_breakdown.contains_key("vibes"));
    }

    #[test]
    fn judgment_deserializes_with_defaults() {
        let j: Judgment = serde_json::from_value(serde_json::json!({
            "score_breakdown": { "a": 50 },
            "overall_score": 50,
            "passed": false
        }))
        .unwrap();
        assert!(j.blockers.is_empty());
        assert!(j.recommendation.is_empty());
    }
}
