//! The five layer evaluators.
//!
//! Each evaluator starts from a baseline of 100 and applies fixed
//! deductions. Authenticity, evidence and integrity are pure functions of the
//! snapshot. Governance and security consult optional collaborators through
//! the bounded helpers below, which turn timeouts into degraded answers and
//! never fail.

pub mod authenticity;
pub mod evidence;
pub mod governance;
pub mod integrity;
pub mod security;

use std::time::Duration;

use stratagate_store::{
    AssessmentLookup, AssessmentRecord, Lookup, PermissionCheck, PermissionDecision,
    PermissionQuery, TargetRef,
};

use crate::metrics::{Counter, METRICS};
use crate::obs;

/// Baseline every layer starts from.
pub const BASELINE: i64 = 100;

/// List assessments for `target`, bounded by `timeout`.
///
/// Timeouts and collaborator failures both come back as `Lookup::Degraded`.
pub async fn fetch_assessments(
    lookup: &dyn AssessmentLookup,
    target: &TargetRef,
    timeout: Duration,
) -> Lookup<Vec<AssessmentRecord>> {
    let answer = match tokio::time::timeout(timeout, lookup.list_by_target(target)).await {
        Ok(answer) => answer,
        Err(_) => Lookup::Degraded {
            reason: format!("assessment lookup timed out after {}ms", timeout.as_millis()),
        },
    };
    if let Lookup::Degraded { reason } = &answer {
        obs::emit_lookup_degraded("assessment_lookup", reason);
        METRICS.incr(Counter::DegradedLookups);
    }
    answer
}

/// Ask the permission collaborator, bounded by `timeout`.
///
/// An elapsed timeout is reported as `PermissionDecision::Unavailable`.
pub async fn check_permission(
    check: &dyn PermissionCheck,
    query: &PermissionQuery,
    timeout: Duration,
) -> PermissionDecision {
    let decision = match tokio::time::timeout(timeout, check.check(query)).await {
        Ok(decision) => decision,
        Err(_) => PermissionDecision::Unavailable {
            reason: format!("permission check timed out after {}ms", timeout.as_millis()),
        },
    };
    if let PermissionDecision::Unavailable { reason } = &decision {
        obs::emit_lookup_degraded("permission_check", reason);
        METRICS.incr(Counter::DegradedLookups);
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stratagate_store::fakes::StaticPermissionCheck;
    use stratagate_store::EntityKind;

    struct StalledLookup;

    #[async_trait]
    impl AssessmentLookup for StalledLookup {
        async fn list_by_target(&self, _target: &TargetRef) -> Lookup<Vec<AssessmentRecord>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Lookup::Absent
        }
    }

    struct StalledPermission;

    #[async_trait]
    impl PermissionCheck for StalledPermission {
        async fn check(&self, _query: &PermissionQuery) -> PermissionDecision {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            PermissionDecision::Allow
        }
    }

    fn target() -> TargetRef {
        TargetRef::new(EntityKind::Project, "p-1")
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_assessment_lookup_degrades() {
        let answer = fetch_assessments(&StalledLookup, &target(), Duration::from_millis(50)).await;
        assert!(answer.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_permission_check_is_unavailable() {
        let query = PermissionQuery {
            actor: "ana".into(),
            target: target(),
            action: "validate".into(),
        };
        let decision =
            check_permission(&StalledPermission, &query, Duration::from_millis(50)).await;
        assert!(matches!(decision, PermissionDecision::Unavailable { .. }));
    }

    #[tokio::test]
    async fn prompt_permission_answer_passes_through() {
        let query = PermissionQuery {
            actor: "ana".into(),
            target: target(),
            action: "validate".into(),
        };
        let decision = check_permission(
            &StaticPermissionCheck::deny("not a member"),
            &query,
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(decision, PermissionDecision::Deny { .. }));
    }
}
