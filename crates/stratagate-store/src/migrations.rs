//! SurrealDB schema migrations and initialization
//!
//! Defines the tables backing the entity store, the optional lookups and the
//! result sink, with the indexes their access paths rely on.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all Stratagate tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing Stratagate SurrealDB schema");

    init_entities_table(db).await?;
    init_assessments_table(db).await?;
    init_benchmarks_table(db).await?;
    init_validations_table(db).await?;
    init_stage_gates_table(db).await?;

    info!("Stratagate schema initialization complete");
    Ok(())
}

/// Initialize `entities` table
///
/// Schema:
/// ```text
/// TABLE entities {
///   kind:       STRING (project | strategy | analysis | deliverable)
///   entity_id:  STRING
///   fields:     OBJECT
/// }
/// ```
///
/// `(kind, entity_id)` is unique.
async fn init_entities_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing entities table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS entities SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_entity_key ON TABLE entities COLUMNS kind, entity_id UNIQUE;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}

/// Initialize `assessments` table, indexed by target.
async fn init_assessments_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing assessments table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS assessments SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_assessment_id ON TABLE assessments COLUMNS assessment_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_assessment_target ON TABLE assessments COLUMNS target_kind, target_id;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}

/// Initialize `benchmarks` table, indexed by project.
async fn init_benchmarks_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing benchmarks table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS benchmarks SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_benchmark_project ON TABLE benchmarks COLUMNS project_id;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}

/// Initialize `validations` table
///
/// Schema:
/// ```text
/// TABLE validations {
///   record_id:        STRING (unique)
///   target_kind:      STRING
///   target_id:        STRING
///   status:           STRING (passed | failed | blocked)
///   aggregate_score:  INT
///   digest:           STRING
///   payload:          OBJECT
///   created_at:       DATETIME
/// }
/// ```
///
/// Records are append-only: update and delete are denied.
async fn init_validations_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing validations table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS validations AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_record_id ON TABLE validations COLUMNS record_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_validation_target ON TABLE validations COLUMNS target_kind, target_id, created_at;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}

/// Initialize `stage_gates` table
///
/// One row per `(project_id, gate_number)`; writes replace the previous row.
async fn init_stage_gates_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing stage_gates table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS stage_gates SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_stage_gate_key ON TABLE stage_gates COLUMNS project_id, gate_number UNIQUE;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}
