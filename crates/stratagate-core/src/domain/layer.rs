//! Layer results and diagnostics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One independent scoring dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerName {
    Authenticity,
    Evidence,
    Governance,
    Integrity,
    Security,
}

impl LayerName {
    /// Evaluation and reporting order.
    pub const ALL: [LayerName; 5] = [
        LayerName::Authenticity,
        LayerName::Evidence,
        LayerName::Governance,
        LayerName::Integrity,
        LayerName::Security,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerName::Authenticity => "authenticity",
            LayerName::Evidence => "evidence",
            LayerName::Governance => "governance",
            LayerName::Integrity => "integrity",
            LayerName::Security => "security",
        }
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Outcome of a single check inside a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub check_name: String,
    pub passed: bool,
    pub severity: Severity,
    /// Points deducted from the layer baseline (0 when passed).
    pub deduction: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn pass(check_name: &str, message: impl Into<String>) -> Self {
        Self {
            check_name: check_name.to_string(),
            passed: true,
            severity: Severity::Info,
            deduction: 0,
            message: message.into(),
        }
    }

    pub fn fail(
        check_name: &str,
        severity: Severity,
        deduction: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check_name: check_name.to_string(),
            passed: false,
            severity,
            deduction,
            message: message.into(),
        }
    }
}

/// Clamp any intermediate score into `[0, 100]`.
pub fn clamp_score(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Result of one layer evaluator.
///
/// # Invariants
///
/// `score` is always within `[0, 100]`; the constructors clamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    pub layer: LayerName,
    pub score: u8,
    /// Checks in the order the evaluator ran them.
    pub diagnostics: Vec<Diagnostic>,
    pub derived: BTreeMap<String, serde_json::Value>,
}

impl LayerResult {
    /// Build a result by subtracting every diagnostic's deduction from `baseline`.
    pub fn from_deductions(layer: LayerName, baseline: i64, diagnostics: Vec<Diagnostic>) -> Self {
        let deducted: i64 = diagnostics.iter().map(|d| i64::from(d.deduction)).sum();
        Self {
            layer,
            score: clamp_score(baseline - deducted),
            diagnostics,
            derived: BTreeMap::new(),
        }
    }

    /// Build a result with an explicitly computed score.
    pub fn with_score(layer: LayerName, score: i64, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            layer,
            score: clamp_score(score),
            diagnostics,
            derived: BTreeMap::new(),
        }
    }

    pub fn derive(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.derived.insert(key.to_string(), value.into());
        self
    }

    pub fn derived_bool(&self, key: &str) -> Option<bool> {
        self.derived.get(key).and_then(|v| v.as_bool())
    }

    pub fn derived_u8(&self, key: &str) -> Option<u8> {
        self.derived
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|n| n.min(100) as u8)
    }

    /// Names of failed checks.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter(|d| !d.passed)
            .map(|d| d.check_name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deductions_are_clamped_at_zero() {
        let diags = vec![
            Diagnostic::fail("a", Severity::High, 80, "a"),
            Diagnostic::fail("b", Severity::High, 80, "b"),
        ];
        let r = LayerResult::from_deductions(LayerName::Integrity, 100, diags);
        assert_eq!(r.score, 0);
        assert_eq!(r.failed_checks(), vec!["a", "b"]);
    }

    #[test]
    fn explicit_score_is_clamped_at_hundred() {
        let r = LayerResult::with_score(LayerName::Governance, 130, vec![]);
        assert_eq!(r.score, 100);
    }

    #[test]
    fn derived_accessors() {
        let r = LayerResult::with_score(LayerName::Security, 70, vec![])
            .derive("audit_trail", false)
            .derive("consistency_score", 85u8);
        assert_eq!(r.derived_bool("audit_trail"), Some(false));
        assert_eq!(r.derived_u8("consistency_score"), Some(85));
        assert_eq!(r.derived_u8("missing"), None);
    }
}
