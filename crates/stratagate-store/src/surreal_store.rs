//! SurrealDB-backed collaborator implementations
//!
//! A single [`SurrealStore`] implements [`EntityStore`], [`AssessmentLookup`],
//! [`KnowledgeLookup`] and [`ResultSink`] over one connection, converting
//! to/from `storage_traits` types via the rows in `schema`.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, warn};

use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::schema::{AssessmentRow, BenchmarkRow, EntityRow, StageGateRow, ValidationRow};
use crate::storage_traits::{
    AssessmentLookup, AssessmentRecord, EntityRecord, EntityStore, KnowledgeLookup, Lookup,
    ResultSink, StorageResult, StoredStageGate, StoredValidation, TargetRef,
};

const DEFAULT_NAMESPACE: &str = "stratagate";
const DEFAULT_DATABASE: &str = "main";
const LOCAL_DB_PATH: &str = ".stratagate/db";

fn backend(e: surrealdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// SurrealDB-backed store.
#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Any>,
}

impl SurrealStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `stratagate/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        let store = Self::connect("mem://").await?;
        info!("SurrealStore connected (in-memory)");
        Ok(store)
    }

    /// Connect to an arbitrary SurrealDB endpoint (`mem://`, `surrealkv://path`,
    /// `ws://host:port`, ...).
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(DEFAULT_NAMESPACE)
            .use_db(DEFAULT_DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        Ok(Self { db })
    }

    /// Create from environment variables.
    ///
    /// Uses `SURREALDB_URL` when set, otherwise local persistence under
    /// `.stratagate/db`.
    pub async fn from_env() -> crate::Result<Self> {
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            let store = Self::connect(&url).await?;
            info!("SurrealStore connected ({})", url);
            return Ok(store);
        }

        std::fs::create_dir_all(LOCAL_DB_PATH).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                LOCAL_DB_PATH, e
            ))
        })?;
        let url = format!("surrealkv://{}", LOCAL_DB_PATH);
        info!("No SURREALDB_URL found, using local persistence: {}", url);
        Self::connect(&url).await
    }

    /// Insert or replace an entity.
    pub async fn put_entity(&self, record: &EntityRecord) -> StorageResult<()> {
        let row = EntityRow::from_record(record);
        debug!(target = %record.target(), "putting entity");
        self.db
            .query("DELETE entities WHERE kind = $kind AND entity_id = $eid; CREATE entities CONTENT $row;")
            .bind(("kind", row.kind.clone()))
            .bind(("eid", row.entity_id.clone()))
            .bind(("row", row))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;
        Ok(())
    }

    /// Record an assessment against a target.
    pub async fn put_assessment(&self, record: &AssessmentRecord) -> StorageResult<()> {
        let _created: Option<AssessmentRow> = self
            .db
            .create("assessments")
            .content(AssessmentRow::from_record(record))
            .await
            .map_err(backend)?;
        Ok(())
    }

    /// Record a comparison entry for a project.
    pub async fn put_benchmark(
        &self,
        project_id: &str,
        data: serde_json::Value,
    ) -> StorageResult<()> {
        let _created: Option<BenchmarkRow> = self
            .db
            .create("benchmarks")
            .content(BenchmarkRow {
                id: None,
                project_id: project_id.to_string(),
                data,
            })
            .await
            .map_err(backend)?;
        Ok(())
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_entity(&self, target: &TargetRef) -> StorageResult<Option<EntityRow>> {
        let mut res = self
            .db
            .query("SELECT * FROM entities WHERE kind = $kind AND entity_id = $eid")
            .bind(("kind", target.kind.as_str().to_string()))
            .bind(("eid", target.id.clone()))
            .await
            .map_err(backend)?;

        let rows: Vec<EntityRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }

    async fn try_list_assessments(
        &self,
        target: &TargetRef,
    ) -> StorageResult<Vec<AssessmentRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM assessments WHERE target_kind = $kind AND target_id = $tid ORDER BY created_at ASC")
            .bind(("kind", target.kind.as_str().to_string()))
            .bind(("tid", target.id.clone()))
            .await
            .map_err(backend)?;

        let rows: Vec<AssessmentRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(AssessmentRow::into_record).collect()
    }

    async fn try_list_benchmarks(&self, project_id: &str) -> StorageResult<Vec<serde_json::Value>> {
        let mut res = self
            .db
            .query("SELECT * FROM benchmarks WHERE project_id = $pid")
            .bind(("pid", project_id.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<BenchmarkRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().map(|r| r.data).collect())
    }
}

#[async_trait]
impl EntityStore for SurrealStore {
    async fn get(&self, target: &TargetRef) -> StorageResult<Option<EntityRecord>> {
        self.fetch_entity(target)
            .await?
            .map(EntityRow::into_record)
            .transpose()
    }

    async fn update_fields(
        &self,
        target: &TargetRef,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> StorageResult<()> {
        let row = self
            .fetch_entity(target)
            .await?
            .ok_or_else(|| StorageError::EntityNotFound {
                kind: target.kind.to_string(),
                id: target.id.clone(),
            })?;

        let mut record = row.into_record()?;
        record.fields.extend(fields);

        self.db
            .query("UPDATE entities SET fields = $fields WHERE kind = $kind AND entity_id = $eid")
            .bind(("fields", serde_json::Value::Object(record.fields)))
            .bind(("kind", target.kind.as_str().to_string()))
            .bind(("eid", target.id.clone()))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl AssessmentLookup for SurrealStore {
    async fn list_by_target(&self, target: &TargetRef) -> Lookup<Vec<AssessmentRecord>> {
        match self.try_list_assessments(target).await {
            Ok(rows) => Lookup::from_vec(rows),
            Err(e) => {
                warn!(target = %target, error = %e, "assessment lookup failed");
                Lookup::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl KnowledgeLookup for SurrealStore {
    async fn comparisons(&self, project_id: &str) -> Lookup<Vec<serde_json::Value>> {
        match self.try_list_benchmarks(project_id).await {
            Ok(rows) => Lookup::from_vec(rows),
            Err(e) => {
                warn!(project_id = %project_id, error = %e, "knowledge lookup failed");
                Lookup::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl ResultSink for SurrealStore {
    async fn append_validation(&self, record: StoredValidation) -> StorageResult<()> {
        let mut res = self
            .db
            .query("SELECT * FROM validations WHERE record_id = $rid")
            .bind(("rid", record.record_id.clone()))
            .await
            .map_err(backend)?;
        let existing: Vec<ValidationRow> = res.take(0).map_err(backend)?;
        if !existing.is_empty() {
            return Err(StorageError::DuplicateRecord {
                record_id: record.record_id,
            });
        }

        debug!(record_id = %record.record_id, "appending validation record");
        let _created: Option<ValidationRow> = self
            .db
            .create("validations")
            .content(ValidationRow::from_stored(record))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn get_validation(&self, record_id: &str) -> StorageResult<StoredValidation> {
        let mut res = self
            .db
            .query("SELECT * FROM validations WHERE record_id = $rid")
            .bind(("rid", record_id.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<ValidationRow> = res.take(0).map_err(backend)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::RecordNotFound {
                record_id: record_id.to_string(),
            })?
            .into_stored()
    }

    async fn list_validations(&self, target: &TargetRef) -> StorageResult<Vec<StoredValidation>> {
        let mut res = self
            .db
            .query("SELECT * FROM validations WHERE target_kind = $kind AND target_id = $tid ORDER BY created_at DESC")
            .bind(("kind", target.kind.as_str().to_string()))
            .bind(("tid", target.id.clone()))
            .await
            .map_err(backend)?;

        let rows: Vec<ValidationRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(ValidationRow::into_stored).collect()
    }

    async fn upsert_stage_gate(&self, result: StoredStageGate) -> StorageResult<()> {
        let row = StageGateRow::from(result);
        debug!(project_id = %row.project_id, gate = row.gate_number, "upserting stage gate");

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE stage_gates WHERE project_id = $pid AND gate_number = $gn; \
                 CREATE stage_gates CONTENT $row; \
                 COMMIT TRANSACTION;",
            )
            .bind(("pid", row.project_id.clone()))
            .bind(("gn", row.gate_number))
            .bind(("row", row))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;
        Ok(())
    }

    async fn latest_stage_gate(
        &self,
        project_id: &str,
        gate_number: u8,
    ) -> StorageResult<Option<StoredStageGate>> {
        let mut res = self
            .db
            .query("SELECT * FROM stage_gates WHERE project_id = $pid AND gate_number = $gn")
            .bind(("pid", project_id.to_string()))
            .bind(("gn", gate_number))
            .await
            .map_err(backend)?;

        let rows: Vec<StageGateRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next().map(StoredStageGate::from))
    }
}
