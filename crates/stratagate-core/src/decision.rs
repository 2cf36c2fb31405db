//! Decision engine: hard-stop state plus caller policy to a final status.
//!
//! | unresolved hard stops | enforcement | status  |
//! |-----------------------|-------------|---------|
//! | 0                     | any         | passed  |
//! | ≥1                    | requested   | blocked |
//! | ≥1                    | not requested | failed |
//!
//! Warnings never count. There is no retry; callers re-submit after fixing.

use crate::domain::{HardStop, ValidationStatus};

pub fn decide(hard_stops: &[HardStop], enforce_hard_stops: bool) -> ValidationStatus {
    let unresolved = hard_stops.iter().any(HardStop::is_unresolved_blocker);
    match (unresolved, enforce_hard_stops) {
        (false, _) => ValidationStatus::Passed,
        (true, true) => ValidationStatus::Blocked,
        (true, false) => ValidationStatus::Failed,
    }
}

/// One actionable line per unresolved hard stop, naming the gate, the
/// observed value and the minimum required.
pub fn resolution_checklist(hard_stops: &[HardStop]) -> Vec<String> {
    hard_stops
        .iter()
        .filter(|h| h.is_unresolved_blocker())
        .map(|h| {
            let remedy = remedy_for(h);
            match (h.observed, h.threshold) {
                (Some(observed), Some(threshold)) => format!(
                    "[{}] {}: observed {observed}, minimum {threshold}. {remedy}",
                    h.gate_id, h.message
                ),
                _ => format!("[{}] {}. {remedy}", h.gate_id, h.message),
            }
        })
        .collect()
}

fn remedy_for(hard_stop: &HardStop) -> &'static str {
    use crate::domain::GateId;
    match hard_stop.gate_id {
        GateId::DataQuality => "Declare data sources, including at least one tier-1 source.",
        GateId::Methodology => {
            "Link a cross-validation analysis and a contextual assessment, and record a confidence score."
        }
        GateId::IntegrityConsistency | GateId::CrvValidation => {
            "Add a narrative summary, fill in title and status, and order milestones chronologically."
        }
        GateId::AuditTrail => "Record who last updated the target and when.",
        GateId::AccessControl => "Confirm the actor's access with the permission service.",
    }
}
