//! Markdown renderings of validation and stage-gate outcomes.

use crate::domain::{
    BlockedRejection, GateState, HardStopSeverity, StageGateResult, ValidationRecord,
};

fn gate_icon(state: GateState) -> &'static str {
    match state {
        GateState::Passed => "passed",
        GateState::Warning => "warning",
        GateState::Failed => "FAILED",
    }
}

/// Render a validation record as a Markdown summary.
pub fn render_validation_summary_md(record: &ValidationRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Validation: {}\n\n", record.target));
    out.push_str(&format!(
        "- status: **{}**\n- aggregate score: {}\n- record: `{}`\n- digest: `{}`\n- checks performed: {}\n- duration: {} ms\n\n",
        record.status,
        record.aggregate_score,
        record.record_id,
        record.content_digest().short(),
        record.checks_performed,
        record.duration_ms,
    ));

    out.push_str("## Layers\n\n| layer | score | failed checks |\n|---|---:|---|\n");
    for layer in &record.layers {
        let failed = layer.failed_checks();
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            layer.layer,
            layer.score,
            if failed.is_empty() {
                "-".to_string()
            } else {
                failed.join(", ")
            }
        ));
    }

    out.push_str("\n## Quality Gates\n\n| gate | status | score | details |\n|---|---|---:|---|\n");
    for gate in &record.gates {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            gate.gate_id,
            gate_icon(gate.status),
            gate.score,
            gate.details
        ));
    }

    if !record.hard_stops.is_empty() {
        out.push_str("\n## Hard Stops\n\n");
        for stop in &record.hard_stops {
            let kind = match stop.severity {
                HardStopSeverity::HardStop => "hard stop",
                HardStopSeverity::Warning => "warning",
            };
            match (stop.observed, stop.threshold) {
                (Some(o), Some(t)) => out.push_str(&format!(
                    "- [{kind}] `{}`: {} (observed {o}, minimum {t})\n",
                    stop.gate_id, stop.message
                )),
                _ => out.push_str(&format!("- [{kind}] `{}`: {}\n", stop.gate_id, stop.message)),
            }
        }
    }
    out
}

/// Render a blocked rejection with its resolution checklist.
pub fn render_rejection_md(rejection: &BlockedRejection) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Blocked: {}\n\n", rejection.target));
    out.push_str(&format!(
        "- aggregate score: {}\n- record: `{}`\n- unresolved hard stops: {}\n\n",
        rejection.aggregate_score,
        rejection.record_id,
        rejection.hard_stops.len()
    ));
    out.push_str("## Resolution Checklist\n\n");
    for item in &rejection.resolution_checklist {
        out.push_str(&format!("- [ ] {item}\n"));
    }
    out
}

/// Render a stage-gate result.
pub fn render_stage_gate_md(result: &StageGateResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", result.gate_name));
    out.push_str(&format!(
        "- passed: **{}**\n- overall score: {}\n- evaluated at: {}\n\n",
        result.passed,
        result
            .overall_score
            .map_or_else(|| "-".to_string(), |s| s.to_string()),
        result.evaluated_at.to_rfc3339(),
    ));

    if !result.score_breakdown.is_empty() {
        out.push_str("| criterion | score |\n|---|---:|\n");
        for (criterion, score) in &result.score_breakdown {
            out.push_str(&format!("| {criterion} | {score} |\n"));
        }
        out.push('\n');
    }

    for (title, items) in [
        ("Critical Issues", &result.critical_issues),
        ("Blockers", &result.blockers),
        ("Warnings", &result.warnings),
        ("Required Actions", &result.required_actions),
    ] {
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("## {title}\n\n"));
        for item in items {
            out.push_str(&format!("- {item}\n"));
        }
        out.push('\n');
    }
    out.push_str(&format!("**Recommendation:** {}\n", result.recommendation));
    out
}
