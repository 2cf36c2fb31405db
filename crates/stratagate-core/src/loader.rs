//! Snapshot loader.
//!
//! Resolves a [`ValidationTarget`] to a concrete record and maps its
//! kind-specific field layout onto the common [`EntitySnapshot`]. This is the
//! only place that knows how projects, strategies, analyses and deliverables
//! spell their fields; camelCase and legacy spellings are
//! decoded side by side and merged.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use stratagate_store::{EntityKind, EntityStore, TargetRef};
use tracing::debug;

use crate::domain::stage_gate::normalize_percent;
use crate::domain::{
    DataSource, DeliverableRef, EntitySnapshot, Milestone, Result, ValidateError, ValidationTarget,
};

// ---------------------------------------------------------------------------
// Field layouts
// ---------------------------------------------------------------------------

/// A source entry: either a bare name or a detailed object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceEntry {
    Named(String),
    Detailed(SourceDetail),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceDetail {
    name: Option<String>,
    title: Option<String>,
    source: Option<String>,
    tier: Option<u8>,
    quality_tier: Option<u8>,
    #[serde(rename = "qualityTier")]
    quality_tier_camel: Option<u8>,
}

impl From<SourceEntry> for DataSource {
    fn from(entry: SourceEntry) -> Self {
        match entry {
            SourceEntry::Named(name) => DataSource { name, tier: None },
            SourceEntry::Detailed(d) => DataSource {
                name: d.name.or(d.title).or(d.source).unwrap_or_default(),
                tier: d.tier.or(d.quality_tier).or(d.quality_tier_camel),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MilestoneEntry {
    name: Option<String>,
    title: Option<String>,
    target_date: Option<String>,
    #[serde(rename = "targetDate")]
    target_date_camel: Option<String>,
    due_date: Option<String>,
    #[serde(rename = "dueDate")]
    due_date_camel: Option<String>,
}

/// Confidence spellings; the first present one wins.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfidenceFields {
    confidence_score: Option<f64>,
    #[serde(rename = "confidenceScore")]
    confidence_score_camel: Option<f64>,
    crv_score: Option<f64>,
    #[serde(rename = "crvScore")]
    crv_score_camel: Option<f64>,
}

impl ConfidenceFields {
    fn resolve(self) -> Option<f64> {
        self.confidence_score
            .or(self.confidence_score_camel)
            .or(self.crv_score)
            .or(self.crv_score_camel)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeliverableEntry {
    code: Option<String>,
    #[serde(flatten)]
    confidence: ConfidenceFields,
}

/// Audit and evidence fields shared by every kind, decoded in a separate pass.
///
/// Every spelling is its own field so records carrying both the snake_case
/// and camelCase forms still decode; snake_case wins.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommonFields {
    created_by: Option<String>,
    #[serde(rename = "createdBy")]
    created_by_camel: Option<String>,
    created_at: Option<String>,
    #[serde(rename = "createdAt")]
    created_at_camel: Option<String>,
    updated_by: Option<String>,
    #[serde(rename = "updatedBy")]
    updated_by_camel: Option<String>,
    updated_at: Option<String>,
    #[serde(rename = "updatedAt")]
    updated_at_camel: Option<String>,
    data_sources: Option<Vec<SourceEntry>>,
    #[serde(rename = "dataSources")]
    data_sources_camel: Option<Vec<SourceEntry>>,
    sources: Option<Vec<SourceEntry>>,
    referenced_documents: Option<Vec<String>>,
    #[serde(rename = "referencedDocuments")]
    referenced_documents_camel: Option<Vec<String>>,
    documents: Option<Vec<String>>,
    #[serde(flatten)]
    confidence: ConfidenceFields,
    quality_gates: Option<serde_json::Value>,
    #[serde(rename = "qualityGates")]
    quality_gates_camel: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectFields {
    name: Option<String>,
    title: Option<String>,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    deliverables: Option<Vec<DeliverableEntry>>,
    milestones: Option<Vec<MilestoneEntry>>,
    analysis_results: Option<serde_json::Value>,
    #[serde(rename = "analysisResults")]
    analysis_results_camel: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StrategyFields {
    title: Option<String>,
    name: Option<String>,
    status: Option<String>,
    executive_summary: Option<String>,
    #[serde(rename = "executiveSummary")]
    executive_summary_camel: Option<String>,
    narrative: Option<String>,
    milestones: Option<Vec<MilestoneEntry>>,
    initiatives: Option<Vec<MilestoneEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisFields {
    title: Option<String>,
    name: Option<String>,
    status: Option<String>,
    summary: Option<String>,
    findings: Option<String>,
    results: Option<serde_json::Value>,
    analysis_results: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeliverableFields {
    code: Option<String>,
    title: Option<String>,
    name: Option<String>,
    status: Option<String>,
    content: Option<serde_json::Value>,
    summary: Option<String>,
}

/// A target entity decoded according to its kind.
#[derive(Debug)]
enum TargetEntity {
    Project(ProjectFields),
    Strategy(StrategyFields),
    Analysis(AnalysisFields),
    Deliverable(DeliverableFields),
}

impl TargetEntity {
    fn decode(kind: EntityKind, value: &serde_json::Value) -> Result<Self> {
        let invalid =
            |e: serde_json::Error| ValidateError::InvalidRequest(format!("malformed {kind}: {e}"));
        Ok(match kind {
            EntityKind::Project => {
                TargetEntity::Project(ProjectFields::deserialize(value).map_err(invalid)?)
            }
            EntityKind::Strategy => {
                TargetEntity::Strategy(StrategyFields::deserialize(value).map_err(invalid)?)
            }
            EntityKind::Analysis => {
                TargetEntity::Analysis(AnalysisFields::deserialize(value).map_err(invalid)?)
            }
            EntityKind::Deliverable => {
                TargetEntity::Deliverable(DeliverableFields::deserialize(value).map_err(invalid)?)
            }
        })
    }

    /// Fill the kind-specific parts of `snap`.
    fn apply(self, snap: &mut EntitySnapshot) -> Result<()> {
        match self {
            TargetEntity::Project(p) => {
                snap.title = p.name.or(p.title);
                snap.status = p.status;
                snap.narrative = first_text([p.summary, p.description]);
                snap.has_analysis_results =
                    is_meaningful(&p.analysis_results.or(p.analysis_results_camel));
                snap.deliverables = p
                    .deliverables
                    .unwrap_or_default()
                    .into_iter()
                    .map(|d| DeliverableRef {
                        code: d.code.unwrap_or_default(),
                        confidence_score: d.confidence.resolve(),
                    })
                    .collect();
                snap.milestones = milestones(p.milestones.unwrap_or_default())?;
            }
            TargetEntity::Strategy(s) => {
                snap.title = s.title.or(s.name);
                snap.status = s.status;
                snap.narrative = first_text([
                    s.executive_summary,
                    s.executive_summary_camel,
                    s.narrative,
                ]);
                snap.milestones = milestones(s.milestones.or(s.initiatives).unwrap_or_default())?;
            }
            TargetEntity::Analysis(a) => {
                snap.title = a.title.or(a.name);
                snap.status = a.status;
                snap.narrative = first_text([a.summary, a.findings]);
                snap.has_analysis_results = is_meaningful(&a.results.or(a.analysis_results));
            }
            TargetEntity::Deliverable(d) => {
                snap.title = d.title.or(d.name).or(d.code);
                snap.status = d.status;
                let content_text = d.content.as_ref().and_then(content_as_text);
                snap.narrative = first_text([d.summary, content_text]);
            }
        }
        Ok(())
    }
}

impl CommonFields {
    fn apply(self, snap: &mut EntitySnapshot) -> Result<()> {
        snap.created_by = first_text([self.created_by, self.created_by_camel]);
        snap.updated_by = first_text([self.updated_by, self.updated_by_camel]);
        snap.created_at = self
            .created_at
            .or(self.created_at_camel)
            .as_deref()
            .map(|s| parse_timestamp("created_at", s))
            .transpose()?;
        snap.updated_at = self
            .updated_at
            .or(self.updated_at_camel)
            .as_deref()
            .map(|s| parse_timestamp("updated_at", s))
            .transpose()?;
        snap.data_sources = self
            .data_sources
            .or(self.data_sources_camel)
            .or(self.sources)
            .unwrap_or_default()
            .into_iter()
            .map(Into::into)
            .collect();
        snap.referenced_documents = self
            .referenced_documents
            .or(self.referenced_documents_camel)
            .or(self.documents)
            .unwrap_or_default()
            .into_iter()
            .filter(|d| !d.trim().is_empty())
            .collect();
        snap.confidence_score = self.confidence.resolve().map(normalize_percent);
        snap.has_quality_gate_state =
            is_meaningful(&self.quality_gates.or(self.quality_gates_camel));
        Ok(())
    }
}

fn milestones(entries: Vec<MilestoneEntry>) -> Result<Vec<Milestone>> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let target_date = m
                .target_date
                .or(m.target_date_camel)
                .or(m.due_date)
                .or(m.due_date_camel)
                .as_deref()
                .map(|s| parse_timestamp("milestone target_date", s))
                .transpose()?;
            Ok(Milestone {
                name: m
                    .name
                    .or(m.title)
                    .unwrap_or_else(|| format!("milestone-{}", i + 1)),
                target_date,
            })
        })
        .collect()
}

/// Parse RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(ValidateError::InvalidRequest(format!(
        "{field} is not a valid timestamp: {raw}"
    )))
}

fn first_text<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
}

fn content_as_text(content: &serde_json::Value) -> Option<String> {
    match content {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other if is_meaningful(&Some(other.clone())) => Some(other.to_string()),
        _ => None,
    }
}

/// Present and not null / empty string / empty array / empty object.
fn is_meaningful(value: &Option<serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
        Some(serde_json::Value::Array(a)) => !a.is_empty(),
        Some(serde_json::Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Resolves validation targets against an entity store.
#[derive(Clone)]
pub struct SnapshotLoader {
    store: Arc<dyn EntityStore>,
}

impl SnapshotLoader {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Load and normalise a target.
    ///
    /// # Errors
    ///
    /// - `NotFound` when a by-id target does not exist.
    /// - `InvalidRequest` when fields do not match the kind's layout.
    /// - `Storage` when the entity store itself fails.
    pub async fn load(&self, target: &ValidationTarget) -> Result<EntitySnapshot> {
        match target {
            ValidationTarget::ById { kind, id } => {
                let target_ref = TargetRef::new(*kind, id.clone());
                let record =
                    self.store
                        .get(&target_ref)
                        .await?
                        .ok_or_else(|| ValidateError::NotFound {
                            what: kind.to_string(),
                            id: id.clone(),
                        })?;
                debug!(target = %target_ref, fields = record.fields.len(), "loaded entity");
                snapshot_from_fields(target_ref, record.fields)
            }
            ValidationTarget::Inline { kind, id, fields } => {
                snapshot_from_fields(TargetRef::new(*kind, id.clone()), fields.clone())
            }
        }
    }
}

/// Decode `fields` according to `target.kind` and normalise.
pub fn snapshot_from_fields(
    target: TargetRef,
    fields: serde_json::Map<String, serde_json::Value>,
) -> Result<EntitySnapshot> {
    let value = serde_json::Value::Object(fields);
    let entity = TargetEntity::decode(target.kind, &value)?;
    let common = CommonFields::deserialize(&value).map_err(|e| {
        ValidateError::InvalidRequest(format!("malformed {}: {e}", target.kind))
    })?;

    let mut snap = EntitySnapshot::empty(target);
    entity.apply(&mut snap)?;
    common.apply(&mut snap)?;
    Ok(snap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratagate_store::fakes::MemoryEntityStore;

    fn fields(v: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn project_layout_with_camel_case_aliases() {
        let snap = snapshot_from_fields(
            TargetRef::new(EntityKind::Project, "p-1"),
            fields(json!({
                "name": "Market entry",
                "status": "active",
                "createdBy": "ana",
                "createdAt": "2024-01-10T09:00:00Z",
                "updatedAt": "2024-02-01",
                "dataSources": ["census", { "name": "IBGE", "tier": 1 }],
                "deliverables": [{ "code": "D1", "crvScore": 0.8 }],
                "milestones": [{ "title": "kickoff", "targetDate": "2024-03-01" }],
                "description": "Entry plan for the northeast region",
                "crvScore": 72
            })),
        )
        .unwrap();

        assert_eq!(snap.title.as_deref(), Some("Market entry"));
        assert_eq!(snap.created_by.as_deref(), Some("ana"));
        assert!(snap.updated_at.unwrap() > snap.created_at.unwrap());
        assert_eq!(snap.data_sources.len(), 2);
        assert_eq!(snap.data_sources[0].tier, None);
        assert_eq!(snap.data_sources[1].tier, Some(1));
        assert_eq!(snap.deliverables[0].code, "D1");
        assert_eq!(snap.milestones[0].name, "kickoff");
        assert_eq!(snap.confidence_score, Some(72.0));
        assert!(snap.narrative.is_some());
    }

    #[test]
    fn both_spellings_of_a_field_decode_with_canonical_first() {
        let snap = snapshot_from_fields(
            TargetRef::new(EntityKind::Project, "p-2"),
            fields(json!({
                "name": "Market entry",
                "title": "Legacy title",
                "created_at": "2024-01-10T09:00:00Z",
                "createdAt": "2023-12-31T00:00:00Z",
                "data_sources": [{ "name": "IBGE", "tier": 1, "qualityTier": 3 }],
                "sources": ["blog post"],
                "confidence_score": 64,
                "crvScore": 0.9
            })),
        )
        .unwrap();

        assert_eq!(snap.title.as_deref(), Some("Market entry"));
        assert_eq!(
            snap.created_at.unwrap().to_rfc3339(),
            "2024-01-10T09:00:00+00:00"
        );
        assert_eq!(snap.data_sources.len(), 1);
        assert_eq!(snap.data_sources[0].tier, Some(1));
        assert_eq!(snap.confidence_score, Some(64.0));
    }

    #[test]
    fn strategy_prefers_milestones_over_initiatives() {
        let snap = snapshot_from_fields(
            TargetRef::new(EntityKind::Strategy, "s-2"),
            fields(json!({
                "title": "Growth",
                "name": "growth-v2",
                "milestones": [{ "name": "pilot", "target_date": "2025-01-15" }],
                "initiatives": [{ "title": "ignored" }, { "title": "also ignored" }]
            })),
        )
        .unwrap();
        assert_eq!(snap.title.as_deref(), Some("Growth"));
        assert_eq!(snap.milestones.len(), 1);
        assert_eq!(snap.milestones[0].name, "pilot");
    }

    #[test]
    fn analysis_results_mark_provenance() {
        let snap = snapshot_from_fields(
            TargetRef::new(EntityKind::Analysis, "a-1"),
            fields(json!({ "title": "SWOT", "results": { "strengths": 3 } })),
        )
        .unwrap();
        assert!(snap.has_analysis_results);

        let empty = snapshot_from_fields(
            TargetRef::new(EntityKind::Analysis, "a-2"),
            fields(json!({ "title": "SWOT", "results": {} })),
        )
        .unwrap();
        assert!(!empty.has_analysis_results);
    }

    #[test]
    fn deliverable_content_becomes_narrative() {
        let snap = snapshot_from_fields(
            TargetRef::new(EntityKind::Deliverable, "d-1"),
            fields(json!({ "code": "D5", "content": "Synthesis of findings" })),
        )
        .unwrap();
        assert_eq!(snap.title.as_deref(), Some("D5"));
        assert_eq!(snap.narrative.as_deref(), Some("Synthesis of findings"));
    }

    #[test]
    fn bad_timestamp_is_invalid_request() {
        let err = snapshot_from_fields(
            TargetRef::new(EntityKind::Strategy, "s-1"),
            fields(json!({ "created_at": "yesterday" })),
        )
        .unwrap_err();
        assert!(matches!(err, ValidateError::InvalidRequest(ref m) if m.contains("created_at")));
    }

    #[test]
    fn wrong_field_type_is_invalid_request() {
        let err = snapshot_from_fields(
            TargetRef::new(EntityKind::Project, "p-1"),
            fields(json!({ "milestones": "soon" })),
        )
        .unwrap_err();
        assert!(matches!(err, ValidateError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn missing_entity_is_not_found() {
        let loader = SnapshotLoader::new(Arc::new(MemoryEntityStore::new()));
        let err = loader
            .load(&ValidationTarget::ById {
                kind: EntityKind::Project,
                id: "ghost".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ValidateError::NotFound { .. }));
    }

    #[tokio::test]
    async fn loads_stored_entity_by_id() {
        let store = MemoryEntityStore::new();
        store.insert_json(
            EntityKind::Strategy,
            "s-1",
            json!({ "title": "Growth", "executiveSummary": "Double revenue" }),
        );
        let loader = SnapshotLoader::new(Arc::new(store));
        let snap = loader
            .load(&ValidationTarget::ById {
                kind: EntityKind::Strategy,
                id: "s-1".into(),
            })
            .await
            .unwrap();
        assert_eq!(snap.narrative.as_deref(), Some("Double revenue"));
        assert_eq!(snap.target.id, "s-1");
    }
}
