//! Security layer: creation provenance, audit trail and access control.
//!
//! When the permission collaborator cannot answer, the layer defaults to
//! allow and marks `rbac_degraded`. The gate policy engine turns that flag
//! into an `access_control` warning.

use stratagate_store::PermissionDecision;

use crate::domain::{Diagnostic, EntitySnapshot, LayerName, LayerResult, Severity};

use super::BASELINE;

pub const NO_PROVENANCE_DEDUCTION: u32 = 30;
pub const NO_AUDIT_TRAIL_DEDUCTION: u32 = 20;
pub const ACCESS_DENIED_DEDUCTION: u32 = 40;

pub fn evaluate(snapshot: &EntitySnapshot, permission: &PermissionDecision) -> LayerResult {
    let mut diagnostics = Vec::with_capacity(3);

    let provenance = snapshot.has_field("created_by") && snapshot.has_field("created_at");
    diagnostics.push(if provenance {
        Diagnostic::pass("creation_provenance", "creator and creation time recorded")
    } else {
        Diagnostic::fail(
            "creation_provenance",
            Severity::High,
            NO_PROVENANCE_DEDUCTION,
            "creator or creation timestamp missing",
        )
    });

    let audit_trail = snapshot.has_field("updated_by") && snapshot.has_field("updated_at");
    diagnostics.push(if audit_trail {
        Diagnostic::pass("audit_trail", "updater and update time recorded")
    } else {
        Diagnostic::fail(
            "audit_trail",
            Severity::Medium,
            NO_AUDIT_TRAIL_DEDUCTION,
            "updater or update timestamp missing",
        )
    });

    let (rbac_compliance, rbac_degraded) = match permission {
        PermissionDecision::Allow => {
            diagnostics.push(Diagnostic::pass("access_control", "actor is permitted"));
            (true, false)
        }
        PermissionDecision::Deny { reason } => {
            diagnostics.push(Diagnostic::fail(
                "access_control",
                Severity::Critical,
                ACCESS_DENIED_DEDUCTION,
                format!("access denied: {reason}"),
            ));
            (false, false)
        }
        PermissionDecision::Unavailable { reason } => {
            diagnostics.push(Diagnostic::pass(
                "access_control",
                format!("permission check unavailable, defaulted to allow: {reason}"),
            ));
            (true, true)
        }
    };

    LayerResult::from_deductions(LayerName::Security, BASELINE, diagnostics)
        .derive("provenance", provenance)
        .derive("audit_trail", audit_trail)
        .derive("rbac_compliance", rbac_compliance)
        .derive("rbac_degraded", rbac_degraded)
}
