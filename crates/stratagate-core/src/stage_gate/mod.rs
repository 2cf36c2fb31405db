//! Stage-gate evaluation (Gate 0 / 1 / 2).
//!
//! Each gate requires one upstream deliverable. When it is present the
//! artifact is judged against the gate's rubric by an external collaborator;
//! the pass rule applied to that judgment lives here, not in the judge.

pub mod evaluator;
pub mod judge;
pub mod rubric;

use std::time::Duration;

pub use evaluator::StageGateEvaluator;
pub use judge::{CheckedJudgment, JudgeError, Judgment, JudgmentClient, ScriptedJudge};
pub use rubric::{Criterion, JudgmentRequest, Rubric};

/// Acceptance thresholds and collaborator time bounds.
#[derive(Debug, Clone)]
pub struct StageGateConfig {
    /// Upper bound on one judgment call; elapsed means `JudgmentFailure`.
    pub judgment_timeout: Duration,
    /// Upper bound on the Gate 1 knowledge lookup; elapsed means no comparisons.
    pub lookup_timeout: Duration,
    pub gate0_min_overall: u8,
    pub gate1_min_overall: u8,
    pub gate1_min_confidence: u8,
    pub gate2_min_overall: u8,
}

impl Default for StageGateConfig {
    fn default() -> Self {
        Self {
            judgment_timeout: Duration::from_secs(60),
            lookup_timeout: Duration::from_secs(5),
            gate0_min_overall: 80,
            gate1_min_overall: 75,
            gate1_min_confidence: 70,
            gate2_min_overall: 75,
        }
    }
}

impl StageGateConfig {
    pub fn with_judgment_timeout(mut self, timeout: Duration) -> Self {
        self.judgment_timeout = timeout;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }
}
