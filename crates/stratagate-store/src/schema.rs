//! SurrealDB row types
//!
//! Rows mirror the trait-level types in `storage_traits` but keep enums as
//! strings and timestamps in SurrealDB's native datetime format. Conversion
//! happens at the `SurrealStore` boundary.

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{
    AssessmentKind, AssessmentRecord, ContentDigest, EntityKind, EntityRecord, StorageResult,
    StoredStageGate, StoredValidation, TargetRef,
};

/// Row in `entities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub kind: String,
    pub entity_id: String,
    pub fields: serde_json::Value,
}

impl EntityRow {
    pub fn from_record(record: &EntityRecord) -> Self {
        Self {
            id: None,
            kind: record.kind.as_str().to_string(),
            entity_id: record.id.clone(),
            fields: serde_json::Value::Object(record.fields.clone()),
        }
    }

    pub fn into_record(self) -> StorageResult<EntityRecord> {
        let kind: EntityKind = self.kind.parse()?;
        let fields = match self.fields {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(StorageError::InvalidRecord(format!(
                    "entity {}/{} fields are not an object: {other}",
                    self.kind, self.entity_id
                )))
            }
        };
        Ok(EntityRecord {
            kind,
            id: self.entity_id,
            fields,
        })
    }
}

/// Row in `assessments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub assessment_id: String,
    pub target_kind: String,
    pub target_id: String,
    /// "cross_validation" | "contextual"
    pub kind: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl AssessmentRow {
    pub fn from_record(record: &AssessmentRecord) -> Self {
        Self {
            id: None,
            assessment_id: record.assessment_id.clone(),
            target_kind: record.target.kind.as_str().to_string(),
            target_id: record.target.id.clone(),
            kind: record.kind.as_str().to_string(),
            created_at: record.created_at,
        }
    }

    pub fn into_record(self) -> StorageResult<AssessmentRecord> {
        let kind = match self.kind.as_str() {
            "cross_validation" => AssessmentKind::CrossValidation,
            "contextual" => AssessmentKind::Contextual,
            other => {
                return Err(StorageError::InvalidRecord(format!(
                    "unknown assessment kind: {other}"
                )))
            }
        };
        Ok(AssessmentRecord {
            assessment_id: self.assessment_id,
            target: TargetRef::new(self.target_kind.parse()?, self.target_id),
            kind,
            created_at: self.created_at,
        })
    }
}

/// Row in `benchmarks`: one comparison entry for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub project_id: String,
    pub data: serde_json::Value,
}

/// Row in `validations` (append-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub record_id: String,
    pub target_kind: String,
    pub target_id: String,
    /// "passed" | "failed" | "blocked"
    pub status: String,
    pub aggregate_score: u8,
    pub digest: String,
    pub payload: serde_json::Value,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ValidationRow {
    pub fn from_stored(stored: StoredValidation) -> Self {
        Self {
            id: None,
            record_id: stored.record_id,
            target_kind: stored.target.kind.as_str().to_string(),
            target_id: stored.target.id,
            status: stored.status,
            aggregate_score: stored.aggregate_score,
            digest: stored.digest.as_str().to_string(),
            payload: stored.payload,
            created_at: stored.created_at,
        }
    }

    pub fn into_stored(self) -> StorageResult<StoredValidation> {
        Ok(StoredValidation {
            record_id: self.record_id,
            target: TargetRef::new(self.target_kind.parse()?, self.target_id),
            status: self.status,
            aggregate_score: self.aggregate_score,
            digest: ContentDigest::try_from(self.digest)?,
            payload: self.payload,
            created_at: self.created_at,
        })
    }
}

/// Row in `stage_gates` (one per project and gate number).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageGateRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub project_id: String,
    pub gate_number: u8,
    pub passed: bool,
    pub payload: serde_json::Value,
    #[serde(with = "surreal_datetime")]
    pub evaluated_at: DateTime<Utc>,
}

impl From<StoredStageGate> for StageGateRow {
    fn from(s: StoredStageGate) -> Self {
        Self {
            id: None,
            project_id: s.project_id,
            gate_number: s.gate_number,
            passed: s.passed,
            payload: s.payload,
            evaluated_at: s.evaluated_at,
        }
    }
}

impl From<StageGateRow> for StoredStageGate {
    fn from(r: StageGateRow) -> Self {
        Self {
            project_id: r.project_id,
            gate_number: r.gate_number,
            passed: r.passed,
            payload: r.payload,
            evaluated_at: r.evaluated_at,
        }
    }
}
