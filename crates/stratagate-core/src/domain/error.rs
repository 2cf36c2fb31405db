//! Error taxonomy for validation and stage-gate runs.
//!
//! Degraded auxiliary lookups are deliberately absent: they are recovered
//! inside the evaluators and only surface as log events and counters.

use stratagate_store::StorageError;

use super::record::BlockedRejection;

/// Errors returned by the validation pipeline and the stage-gate evaluator.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// Target entity or required artifact missing. Terminal.
    #[error("{what} not found: {id}")]
    NotFound { what: String, id: String },

    /// Request is missing required fields or is malformed. Terminal.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Weight or threshold tables are inconsistent.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// External judgment collaborator errored or returned malformed output.
    /// Fatal for that gate invocation only; nothing is persisted.
    #[error("judgment failed for gate {gate_number}: {reason}")]
    JudgmentFailure { gate_number: u8, reason: String },

    /// Business-rule rejection: unresolved hard stops with enforcement on.
    #[error("validation blocked by {} unresolved hard stop(s)", .0.hard_stops.len())]
    Blocked(Box<BlockedRejection>),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ValidateError {
    /// `true` for business-rule rejections, `false` for faults.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ValidateError::Blocked(_))
    }

    /// The rejection payload when this is a `Blocked` outcome.
    pub fn as_blocked(&self) -> Option<&BlockedRejection> {
        match self {
            ValidateError::Blocked(b) => Some(b),
            _ => None,
        }
    }
}

/// Result type for validation operations.
pub type Result<T> = std::result::Result<T, ValidateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{GateId, HardStop};
    use stratagate_store::{EntityKind, TargetRef};

    #[test]
    fn not_found_display() {
        let err = ValidateError::NotFound {
            what: "project".into(),
            id: "p-404".into(),
        };
        assert_eq!(err.to_string(), "project not found: p-404");
        assert!(!err.is_rejection());
    }

    #[test]
    fn blocked_is_rejection_and_counts_items() {
        let rejection = BlockedRejection {
            record_id: uuid::Uuid::new_v4(),
            target: TargetRef::new(EntityKind::Project, "p-1"),
            aggregate_score: 41,
            hard_stops: vec![HardStop::blocking(
                GateId::DataQuality,
                "critical data quality failure",
                50,
                30,
            )],
            resolution_checklist: vec!["raise evidence".into()],
        };
        let err = ValidateError::Blocked(Box::new(rejection));
        assert!(err.is_rejection());
        assert!(err.to_string().contains("1 unresolved hard stop"));
        assert_eq!(err.as_blocked().unwrap().aggregate_score, 41);
    }

    #[test]
    fn storage_error_converts() {
        let err: ValidateError = StorageError::Backend("down".into()).into();
        assert!(err.to_string().contains("storage error"));
    }
}
