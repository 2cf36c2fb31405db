//! The common snapshot shape every layer evaluator reads.
//!
//! Kind-specific field layouts are resolved once by the loader; evaluators
//! never see the raw entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stratagate_store::TargetRef;

/// Lowest source quality tier; untiered sources fall here.
pub const LOWEST_TIER: u8 = 4;

/// An evidentiary source declared on the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,
    /// Quality tier, 1 (highest) to 4. `None` when undeclared.
    pub tier: Option<u8>,
}

impl DataSource {
    /// Declared tier clamped to `1..=4`; undeclared or out-of-range is tier 4.
    pub fn effective_tier(&self) -> u8 {
        match self.tier {
            Some(t @ 1..=LOWEST_TIER) => t,
            _ => LOWEST_TIER,
        }
    }
}

/// A dated milestone, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    pub target_date: Option<DateTime<Utc>>,
}

/// A deliverable attached to the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableRef {
    pub code: String,
    pub confidence_score: Option<f64>,
}

/// Kind-independent view of a validation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub target: TargetRef,
    pub title: Option<String>,
    pub status: Option<String>,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub data_sources: Vec<DataSource>,
    pub referenced_documents: Vec<String>,
    pub has_analysis_results: bool,
    pub deliverables: Vec<DeliverableRef>,
    pub milestones: Vec<Milestone>,
    /// First non-empty narrative text (summary, description, content ...).
    pub narrative: Option<String>,
    /// Declared confidence / CRV score on a 0-100 scale.
    pub confidence_score: Option<f64>,
    pub has_quality_gate_state: bool,
}

impl EntitySnapshot {
    /// An empty snapshot for `target`; every optional field absent.
    pub fn empty(target: TargetRef) -> Self {
        Self {
            target,
            title: None,
            status: None,
            created_by: None,
            created_at: None,
            updated_by: None,
            updated_at: None,
            data_sources: Vec::new(),
            referenced_documents: Vec::new(),
            has_analysis_results: false,
            deliverables: Vec::new(),
            milestones: Vec::new(),
            narrative: None,
            confidence_score: None,
            has_quality_gate_state: false,
        }
    }

    /// Whether a named field is present and non-empty.
    ///
    /// Recognised names: `title`, `status`, `narrative`, `created_by`,
    /// `created_at`, `updated_by`, `updated_at`, `confidence_score`.
    pub fn has_field(&self, name: &str) -> bool {
        fn present(s: &Option<String>) -> bool {
            s.as_deref().is_some_and(|v| !v.trim().is_empty())
        }
        match name {
            "title" => present(&self.title),
            "status" => present(&self.status),
            "narrative" => present(&self.narrative),
            "created_by" => present(&self.created_by),
            "updated_by" => present(&self.updated_by),
            "created_at" => self.created_at.is_some(),
            "updated_at" => self.updated_at.is_some(),
            "confidence_score" => self.confidence_score.is_some(),
            _ => false,
        }
    }

    /// Field names `has_field` understands.
    pub const KNOWN_FIELDS: [&'static str; 8] = [
        "title",
        "status",
        "narrative",
        "created_by",
        "created_at",
        "updated_by",
        "updated_at",
        "confidence_score",
    ];
}
