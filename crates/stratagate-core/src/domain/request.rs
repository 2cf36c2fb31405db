//! Validation request and response envelopes.

use serde::{Deserialize, Serialize};
use stratagate_store::{EntityKind, TargetRef};
use uuid::Uuid;

use super::error::{Result, ValidateError};
use super::record::{HardStop, QualityGateStatus, ValidationRecord, ValidationStatus};

/// Actor used for the permission check when the request names none.
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// What to validate: a stored entity or an inline payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationTarget {
    ById {
        kind: EntityKind,
        id: String,
    },
    Inline {
        kind: EntityKind,
        id: String,
        fields: serde_json::Map<String, serde_json::Value>,
    },
}

impl ValidationTarget {
    pub fn target_ref(&self) -> TargetRef {
        match self {
            ValidationTarget::ById { kind, id } | ValidationTarget::Inline { kind, id, .. } => {
                TargetRef::new(*kind, id.clone())
            }
        }
    }
}

/// Wire-level validation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub target_kind: EntityKind,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub inline_target: Option<serde_json::Value>,
    #[serde(default)]
    pub enforce_hard_stops: bool,
    #[serde(default)]
    pub actor: Option<String>,
}

impl ValidationRequest {
    pub fn by_id(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            target_kind: kind,
            target_id: Some(id.into()),
            inline_target: None,
            enforce_hard_stops: false,
            actor: None,
        }
    }

    pub fn inline(kind: EntityKind, payload: serde_json::Value) -> Self {
        Self {
            target_kind: kind,
            target_id: None,
            inline_target: Some(payload),
            enforce_hard_stops: false,
            actor: None,
        }
    }

    pub fn with_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_hard_stops = enforce;
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn actor(&self) -> &str {
        self.actor.as_deref().unwrap_or(ANONYMOUS_ACTOR)
    }

    /// Resolve to exactly one target form.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when neither `target_id` nor `inline_target` is given,
    /// when the id is blank, or when the inline payload is not an object.
    /// An inline payload takes its id from `target_id` if given, then from
    /// its own `id` field, then falls back to `"inline"`.
    pub fn target(&self) -> Result<ValidationTarget> {
        match (&self.target_id, &self.inline_target) {
            (None, None) => Err(ValidateError::InvalidRequest(
                "one of target_id or inline_target is required".to_string(),
            )),
            (Some(id), None) => {
                if id.trim().is_empty() {
                    return Err(ValidateError::InvalidRequest(
                        "target_id must not be empty".to_string(),
                    ));
                }
                Ok(ValidationTarget::ById {
                    kind: self.target_kind,
                    id: id.clone(),
                })
            }
            (_, Some(serde_json::Value::Object(fields))) => {
                let id = self
                    .target_id
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| fields.get("id").and_then(|v| v.as_str()).map(String::from))
                    .unwrap_or_else(|| "inline".to_string());
                Ok(ValidationTarget::Inline {
                    kind: self.target_kind,
                    id,
                    fields: fields.clone(),
                })
            }
            (_, Some(_)) => Err(ValidateError::InvalidRequest(
                "inline_target must be a JSON object".to_string(),
            )),
        }
    }
}

/// Successful (passed or failed) validation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub success: bool,
    pub record_id: Uuid,
    pub aggregate_score: u8,
    pub status: ValidationStatus,
    pub gates: Vec<QualityGateStatus>,
    pub hard_stops: Vec<HardStop>,
    pub duration_ms: u64,
    pub digest: String,
}

impl ValidationResponse {
    pub fn from_record(record: &ValidationRecord) -> Self {
        Self {
            success: true,
            record_id: record.record_id,
            aggregate_score: record.aggregate_score,
            status: record.status,
            gates: record.gates.clone(),
            hard_stops: record.hard_stops.clone(),
            duration_ms: record.duration_ms,
            digest: record.content_digest().to_string(),
        }
    }
}
