//! Stage-gate evaluator.
//!
//! ```text
//! request ─▶ required artifact present? ──no──▶ fixed blocker result
//!                     │ yes
//!                     ▼
//!            rubric + comparisons (Gate 1) ─▶ judge ─▶ shape check
//!                     │
//!                     ▼
//!            gate pass rule ─▶ sequencing warning ─▶ upsert latest result
//! ```
//!
//! A judgment failure aborts the invocation before anything is written.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use stratagate_store::{
    EntityKind, EntityStore, KnowledgeLookup, Lookup, ResultSink, StoredStageGate, TargetRef,
};
use tracing::debug;

use super::judge::{CheckedJudgment, JudgmentClient};
use super::rubric::{JudgmentRequest, Rubric};
use super::StageGateConfig;
use crate::domain::{
    DeliverableInput, GateNumber, Result, StageGateRequest, StageGateResponse, StageGateResult,
    ValidateError,
};
use crate::metrics::{Counter, METRICS};
use crate::obs;

/// Evaluates Gate 0/1/2 and keeps the latest result per gate.
#[derive(Clone)]
pub struct StageGateEvaluator {
    judge: Arc<dyn JudgmentClient>,
    knowledge: Arc<dyn KnowledgeLookup>,
    sink: Arc<dyn ResultSink>,
    projects: Option<Arc<dyn EntityStore>>,
    config: StageGateConfig,
}

impl StageGateEvaluator {
    pub fn new(
        judge: Arc<dyn JudgmentClient>,
        knowledge: Arc<dyn KnowledgeLookup>,
        sink: Arc<dyn ResultSink>,
        config: StageGateConfig,
    ) -> Self {
        Self {
            judge,
            knowledge,
            sink,
            projects: None,
            config,
        }
    }

    /// Also mirror each result onto the project record as `stage_gate_<n>`.
    pub fn with_project_store(mut self, projects: Arc<dyn EntityStore>) -> Self {
        self.projects = Some(projects);
        self
    }

    /// Evaluate one gate for one project.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` when `project_id` is blank.
    /// - `JudgmentFailure` when the judge errors, times out, or returns a
    ///   malformed judgment. Nothing is persisted in that case.
    /// - `Storage` when reading the previous gate or writing the result fails.
    pub async fn evaluate(&self, request: &StageGateRequest) -> Result<StageGateResponse> {
        if request.project_id.trim().is_empty() {
            return Err(ValidateError::InvalidRequest(
                "project_id must not be empty".to_string(),
            ));
        }
        let gate = request.gate_number;
        let code = gate.required_artifact();

        let mut result = match request.deliverable(code) {
            None => missing_artifact_result(gate),
            Some(artifact) => {
                let checked = self.judge_artifact(request, artifact).await?;
                self.apply_pass_rule(gate, artifact, checked)
            }
        };

        if let Some(warning) = self.sequencing_warning(&request.project_id, gate).await? {
            result.warnings.push(warning);
        }

        self.persist(&request.project_id, &result).await?;

        METRICS.incr(Counter::StageGatesEvaluated);
        obs::emit_stage_gate_evaluated(
            &request.project_id,
            gate.as_u8(),
            result.overall_score,
            result.passed,
        );

        Ok(StageGateResponse {
            success: true,
            gate_number: gate,
            result,
        })
    }

    /// Latest stored result for a project's gate, if any.
    pub async fn latest(
        &self,
        project_id: &str,
        gate: GateNumber,
    ) -> Result<Option<StageGateResult>> {
        match self.sink.latest_stage_gate(project_id, gate.as_u8()).await? {
            Some(stored) => Ok(Some(serde_json::from_value(stored.payload)?)),
            None => Ok(None),
        }
    }

    async fn judge_artifact(
        &self,
        request: &StageGateRequest,
        artifact: &DeliverableInput,
    ) -> Result<CheckedJudgment> {
        let gate = request.gate_number;
        let rubric = Rubric::for_gate(gate);
        let comparisons = if gate == GateNumber::One {
            self.comparisons(&request.project_id).await
        } else {
            Vec::new()
        };

        let judgment_request = JudgmentRequest {
            project_id: request.project_id.clone(),
            gate_number: gate,
            gate_name: gate.gate_name().to_string(),
            artifact_code: artifact.code.clone(),
            artifact_name: gate.artifact_name().to_string(),
            artifact: artifact.content.clone(),
            confidence_score: artifact.confidence_percent(),
            rubric: rubric.clone(),
            comparisons,
        };

        let failure = |reason: String| ValidateError::JudgmentFailure {
            gate_number: gate.as_u8(),
            reason,
        };
        let judgment = tokio::time::timeout(
            self.config.judgment_timeout,
            self.judge.judge(&judgment_request),
        )
        .await
        .map_err(|_| {
            failure(format!(
                "judge did not answer within {}ms",
                self.config.judgment_timeout.as_millis()
            ))
        })?
        .map_err(|e| failure(e.to_string()))?;

        judgment
            .check_against(&rubric)
            .map_err(|e| failure(e.to_string()))
    }

    /// Gate 1 comparison data. Degraded or timed-out lookups yield an empty set.
    async fn comparisons(&self, project_id: &str) -> Vec<serde_json::Value> {
        let answer = match tokio::time::timeout(
            self.config.lookup_timeout,
            self.knowledge.comparisons(project_id),
        )
        .await
        {
            Ok(answer) => answer,
            Err(_) => Lookup::Degraded {
                reason: format!(
                    "knowledge lookup timed out after {}ms",
                    self.config.lookup_timeout.as_millis()
                ),
            },
        };
        if let Lookup::Degraded { reason } = &answer {
            obs::emit_lookup_degraded("knowledge_lookup", reason);
            METRICS.incr(Counter::DegradedLookups);
        }
        answer.found().unwrap_or_default()
    }

    /// Apply the gate's own acceptance rule. The judge's `passed` is ignored.
    fn apply_pass_rule(
        &self,
        gate: GateNumber,
        artifact: &DeliverableInput,
        checked: CheckedJudgment,
    ) -> StageGateResult {
        let CheckedJudgment {
            score_breakdown,
            overall_score,
            judgment,
        } = checked;
        let mut critical_issues = judgment.critical_issues;
        let mut blockers = judgment.blockers;
        let mut required_actions = judgment.required_actions;

        let min_overall = match gate {
            GateNumber::Zero => self.config.gate0_min_overall,
            GateNumber::One => self.config.gate1_min_overall,
            GateNumber::Two => self.config.gate2_min_overall,
        };
        let mut passed = overall_score >= min_overall;
        if !passed {
            critical_issues.push(format!(
                "Pontuação geral {overall_score}% abaixo do mínimo de {min_overall}%"
            ));
        }

        match gate {
            // No critical blockers may remain.
            GateNumber::Zero => passed &= blockers.is_empty(),
            GateNumber::One => {
                let min_conf = self.config.gate1_min_confidence;
                match artifact.confidence_percent() {
                    Some(conf) if conf >= f64::from(min_conf) => {}
                    Some(conf) => {
                        passed = false;
                        blockers.push(format!(
                            "Confiança do {} de {:.0}% abaixo do mínimo de {min_conf}%",
                            artifact.code, conf
                        ));
                    }
                    None => {
                        passed = false;
                        blockers.push(format!(
                            "{} não declara pontuação de confiança (mínimo {min_conf}%)",
                            artifact.code
                        ));
                    }
                }
            }
            GateNumber::Two => {
                if !judgment.unmitigated_critical_risks.is_empty() {
                    passed = false;
                    for risk in &judgment.unmitigated_critical_risks {
                        blockers.push(format!("Risco crítico sem mitigação: {risk}"));
                    }
                    required_actions.push(
                        "Definir mitigação e responsável para cada risco crítico".to_string(),
                    );
                }
            }
        }

        let recommendation = if !judgment.recommendation.trim().is_empty() {
            judgment.recommendation
        } else if passed {
            format!("Aprovado: {} concluído", gate.gate_name())
        } else {
            format!("Reprovado: resolver os bloqueios antes de reavaliar o Gate {gate}")
        };

        StageGateResult {
            gate_number: gate,
            passed,
            gate_name: gate.gate_name().to_string(),
            score_breakdown,
            overall_score: Some(overall_score),
            critical_issues,
            blockers,
            warnings: judgment.warnings,
            required_actions,
            recommendation,
            evaluated_at: Utc::now(),
        }
    }

    /// Warn when the previous gate has no passing result on record.
    async fn sequencing_warning(
        &self,
        project_id: &str,
        gate: GateNumber,
    ) -> Result<Option<String>> {
        let Some(previous) = gate.previous() else {
            return Ok(None);
        };
        let stored = self
            .sink
            .latest_stage_gate(project_id, previous.as_u8())
            .await?;
        Ok(match stored {
            Some(s) if s.passed => None,
            Some(_) => Some(format!("Gate {previous} foi avaliado mas não aprovado")),
            None => Some(format!("Gate {previous} ainda não foi avaliado")),
        })
    }

    async fn persist(&self, project_id: &str, result: &StageGateResult) -> Result<()> {
        let payload = serde_json::to_value(result)?;
        self.sink
            .upsert_stage_gate(StoredStageGate {
                project_id: project_id.to_string(),
                gate_number: result.gate_number.as_u8(),
                passed: result.passed,
                payload: payload.clone(),
                evaluated_at: result.evaluated_at,
            })
            .await?;

        if let Some(projects) = &self.projects {
            let target = TargetRef::new(EntityKind::Project, project_id);
            let mut fields = serde_json::Map::new();
            fields.insert(format!("stage_gate_{}", result.gate_number), payload);
            // The sink row is authoritative; a failed mirror is only logged.
            match projects.update_fields(&target, fields).await {
                Ok(()) => debug!(project_id, gate = %result.gate_number, "stage gate mirrored"),
                Err(e) => obs::emit_persist_error(project_id, &e),
            }
        }
        Ok(())
    }
}

/// Result for a gate whose required artifact was not supplied.
fn missing_artifact_result(gate: GateNumber) -> StageGateResult {
    let code = gate.required_artifact();
    let name = gate.artifact_name();
    StageGateResult {
        gate_number: gate,
        passed: false,
        gate_name: gate.gate_name().to_string(),
        score_breakdown: BTreeMap::new(),
        overall_score: None,
        critical_issues: vec![format!("{code} ({name}) não foi gerado")],
        blockers: vec![format!("Gerar {code} antes de avaliar o Gate {gate}")],
        warnings: Vec::new(),
        required_actions: vec![format!("Gerar e validar o entregável {code} ({name})")],
        recommendation: format!("Bloqueado: {code} é obrigatório para o Gate {gate}"),
        evaluated_at: Utc::now(),
    }
}
