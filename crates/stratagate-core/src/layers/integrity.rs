//! Integrity layer: milestone ordering, narrative presence, critical fields.

use chrono::{DateTime, Utc};

use crate::domain::{Diagnostic, EntitySnapshot, LayerName, LayerResult, Milestone, Severity};

use super::BASELINE;

pub const MILESTONE_ORDER_DEDUCTION: u32 = 25;
pub const NO_NARRATIVE_DEDUCTION: u32 = 20;
pub const MISSING_FIELD_DEDUCTION: u32 = 10;

/// Index of the first dated milestone that falls before an earlier one.
fn first_ordering_violation(milestones: &[Milestone]) -> Option<usize> {
    let mut latest: Option<DateTime<Utc>> = None;
    for (i, m) in milestones.iter().enumerate() {
        let Some(date) = m.target_date else { continue };
        if latest.is_some_and(|prev| date < prev) {
            return Some(i);
        }
        latest = Some(latest.map_or(date, |prev| prev.max(date)));
    }
    None
}

pub fn evaluate(snapshot: &EntitySnapshot, critical_fields: &[String]) -> LayerResult {
    let mut diagnostics = Vec::with_capacity(2 + critical_fields.len());

    let violation = first_ordering_violation(&snapshot.milestones);
    diagnostics.push(match violation {
        None => Diagnostic::pass("milestone_order", "milestones are chronologically ordered"),
        Some(i) => Diagnostic::fail(
            "milestone_order",
            Severity::High,
            MILESTONE_ORDER_DEDUCTION,
            format!(
                "milestone '{}' is dated before a preceding milestone",
                snapshot.milestones[i].name
            ),
        ),
    });

    diagnostics.push(if snapshot.has_field("narrative") {
        Diagnostic::pass("narrative_present", "narrative text present")
    } else {
        Diagnostic::fail(
            "narrative_present",
            Severity::Medium,
            NO_NARRATIVE_DEDUCTION,
            "no narrative or summary text",
        )
    });

    let mut missing_fields = Vec::new();
    for field in critical_fields {
        if snapshot.has_field(field) {
            diagnostics.push(Diagnostic::pass("critical_field", format!("{field} present")));
        } else {
            missing_fields.push(field.clone());
            diagnostics.push(Diagnostic::fail(
                "critical_field",
                Severity::Medium,
                MISSING_FIELD_DEDUCTION,
                format!("critical field '{field}' is missing"),
            ));
        }
    }

    let result = LayerResult::from_deductions(LayerName::Integrity, BASELINE, diagnostics);
    let consistency = result.score;
    result
        .derive("consistency_score", consistency)
        .derive("milestones_ordered", violation.is_none())
        .derive("missing_fields", missing_fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stratagate_store::{EntityKind, TargetRef};

    fn fields() -> Vec<String> {
        vec!["title".into(), "status".into()]
    }

    fn milestone(name: &str, month: Option<u32>) -> Milestone {
        Milestone {
            name: name.into(),
            target_date: month.map(|m| Utc.with_ymd_and_hms(2024, m, 1, 0, 0, 0).unwrap()),
        }
    }

    fn complete() -> EntitySnapshot {
        let mut s = EntitySnapshot::empty(TargetRef::new(EntityKind::Strategy, "s-1"));
        s.title = Some("Growth".into());
        s.status = Some("draft".into());
        s.narrative = Some("Double revenue in two years".into());
        s
    }

    #[test]
    fn complete_target_scores_100() {
        let r = evaluate(&complete(), &fields());
        assert_eq!(r.score, 100);
        assert_eq!(r.derived_u8("consistency_score"), Some(100));
    }

    #[test]
    fn ordering_violation_is_counted_once() {
        let mut s = complete();
        s.milestones = vec![
            milestone("a", Some(5)),
            milestone("b", Some(3)),
            milestone("c", Some(2)),
        ];
        let r = evaluate(&s, &fields());
        assert_eq!(r.score, 75);
        assert!(r.diagnostics[0].message.contains("'b'"));
    }

    #[test]
    fn undated_milestones_are_skipped() {
        let mut s = complete();
        s.milestones = vec![
            milestone("a", Some(2)),
            milestone("tbd", None),
            milestone("b", Some(4)),
        ];
        assert_eq!(evaluate(&s, &fields()).score, 100);
    }

    #[test]
    fn bare_target_loses_narrative_and_fields() {
        let s = EntitySnapshot::empty(TargetRef::new(EntityKind::Project, "p-1"));
        let r = evaluate(&s, &fields());
        assert_eq!(r.score, 60);
        assert_eq!(
            r.derived["missing_fields"],
            serde_json::json!(["title", "status"])
        );
    }
}
