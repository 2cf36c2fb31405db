//! Stage-gate evaluation across gates, persistence and collaborator failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use stratagate_core::{
    DeliverableInput, GateNumber, JudgeError, Judgment, JudgmentClient, JudgmentRequest, Rubric,
    ScriptedJudge, StageGateConfig, StageGateEvaluator, StageGateRequest, ValidateError,
};
use stratagate_store::fakes::{MemoryEntityStore, MemoryKnowledgeLookup, MemoryResultSink};
use stratagate_store::{EntityKind, EntityStore, TargetRef};

fn deliverable(code: &str, confidence: Option<f64>) -> DeliverableInput {
    DeliverableInput {
        code: code.into(),
        content: json!({ "summary": format!("{code} body") }),
        confidence_score: confidence,
    }
}

fn request(gate: GateNumber, deliverables: Vec<DeliverableInput>) -> StageGateRequest {
    StageGateRequest {
        gate_number: gate,
        project_id: "p-7".into(),
        deliverables,
    }
}

fn evaluator(
    judge: Arc<dyn JudgmentClient>,
    knowledge: Arc<MemoryKnowledgeLookup>,
    sink: Arc<MemoryResultSink>,
) -> StageGateEvaluator {
    StageGateEvaluator::new(judge, knowledge, sink, StageGateConfig::default())
}

/// Judge that never answers.
struct StalledJudge;

#[async_trait]
impl JudgmentClient for StalledJudge {
    async fn judge(&self, _request: &JudgmentRequest) -> Result<Judgment, JudgeError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn gate_zero_without_d1_makes_no_external_call() {
    let judge = Arc::new(ScriptedJudge::failing("must not be called"));
    let sink = Arc::new(MemoryResultSink::new());
    let response = evaluator(judge.clone(), Arc::new(MemoryKnowledgeLookup::new()), sink.clone())
        .evaluate(&request(GateNumber::Zero, vec![]))
        .await
        .unwrap();

    assert!(response.success);
    assert!(!response.result.passed);
    assert_eq!(
        response.result.critical_issues,
        vec!["D1 (Inteligência Fundamental) não foi gerado"]
    );
    assert_eq!(response.result.blockers, vec!["Gerar D1 antes de avaliar o Gate 0"]);
    assert_eq!(judge.calls(), 0);
    // The blocked result is still the latest on record.
    assert_eq!(sink.stage_gate_writes(), 1);
}

#[tokio::test]
async fn gate_one_without_d5_never_reaches_the_judge() {
    let judge = Arc::new(ScriptedJudge::failing("must not be called"));
    let knowledge = Arc::new(MemoryKnowledgeLookup::new());
    let response = evaluator(judge.clone(), knowledge.clone(), Arc::new(MemoryResultSink::new()))
        .evaluate(&request(GateNumber::One, vec![deliverable("D1", Some(90.0))]))
        .await
        .unwrap();

    assert!(!response.result.passed);
    assert_eq!(response.result.overall_score, None);
    assert!(response.result.blockers[0].contains("D5"));
    assert_eq!(judge.calls(), 0);
    assert_eq!(knowledge.calls(), 0);
}

#[tokio::test]
async fn gate_two_without_d7_never_reaches_the_judge() {
    let judge = Arc::new(ScriptedJudge::failing("must not be called"));
    let sink = Arc::new(MemoryResultSink::new());
    let response = evaluator(judge.clone(), Arc::new(MemoryKnowledgeLookup::new()), sink.clone())
        .evaluate(&request(
            GateNumber::Two,
            vec![deliverable("D1", None), deliverable("D5", Some(85.0))],
        ))
        .await
        .unwrap();

    assert!(!response.result.passed);
    assert_eq!(response.gate_number, GateNumber::Two);
    assert_eq!(response.result.overall_score, None);
    assert_eq!(response.result.blockers, vec!["Gerar D7 antes de avaliar o Gate 2"]);
    assert!(response.result.critical_issues[0].starts_with("D7 ("));
    assert_eq!(judge.calls(), 0);
    assert_eq!(sink.stage_gate_writes(), 1);
}

#[tokio::test]
async fn judge_failure_persists_nothing() {
    let sink = Arc::new(MemoryResultSink::new());
    let err = evaluator(
        Arc::new(ScriptedJudge::failing("model overloaded")),
        Arc::new(MemoryKnowledgeLookup::new()),
        sink.clone(),
    )
    .evaluate(&request(GateNumber::Zero, vec![deliverable("D1", None)]))
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ValidateError::JudgmentFailure { gate_number: 0, .. }
    ));
    assert_eq!(sink.stage_gate_writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn judge_timeout_is_a_judgment_failure() {
    let sink = Arc::new(MemoryResultSink::new());
    let eval = StageGateEvaluator::new(
        Arc::new(StalledJudge),
        Arc::new(MemoryKnowledgeLookup::new()),
        sink.clone(),
        StageGateConfig::default().with_judgment_timeout(Duration::from_secs(2)),
    );
    let err = eval
        .evaluate(&request(GateNumber::Two, vec![deliverable("D7", None)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ValidateError::JudgmentFailure { gate_number: 2, .. }));
    assert_eq!(sink.stage_gate_writes(), 0);
}

#[tokio::test]
async fn malformed_judgment_is_a_judgment_failure() {
    let mut judgment = ScriptedJudge::uniform(&Rubric::for_gate(GateNumber::Zero), 85.0);
    let first = judgment.score_breakdown.keys().next().cloned().unwrap();
    judgment.score_breakdown.remove(&first);

    let sink = Arc::new(MemoryResultSink::new());
    let err = evaluator(
        Arc::new(ScriptedJudge::returning(judgment)),
        Arc::new(MemoryKnowledgeLookup::new()),
        sink.clone(),
    )
    .evaluate(&request(GateNumber::Zero, vec![deliverable("D1", None)]))
    .await
    .unwrap_err();
    assert!(matches!(err, ValidateError::JudgmentFailure { .. }));
    assert_eq!(sink.stage_gate_writes(), 0);
}

#[tokio::test]
async fn latest_result_wins() {
    let rubric = Rubric::for_gate(GateNumber::Zero);
    let sink = Arc::new(MemoryResultSink::new());
    let knowledge = Arc::new(MemoryKnowledgeLookup::new());

    let failing = evaluator(
        Arc::new(ScriptedJudge::returning(ScriptedJudge::uniform(&rubric, 60.0))),
        knowledge.clone(),
        sink.clone(),
    );
    let first = failing
        .evaluate(&request(GateNumber::Zero, vec![deliverable("D1", None)]))
        .await
        .unwrap();
    assert!(!first.result.passed);

    let passing = evaluator(
        Arc::new(ScriptedJudge::returning(ScriptedJudge::uniform(&rubric, 91.0))),
        knowledge,
        sink.clone(),
    );
    passing
        .evaluate(&request(GateNumber::Zero, vec![deliverable("D1", None)]))
        .await
        .unwrap();

    assert_eq!(sink.stage_gate_writes(), 2);
    let latest = passing.latest("p-7", GateNumber::Zero).await.unwrap().unwrap();
    assert!(latest.passed);
    assert_eq!(latest.overall_score, Some(91));
}

#[tokio::test]
async fn degraded_knowledge_lookup_still_judges_gate_one() {
    let judge = Arc::new(ScriptedJudge::returning(ScriptedJudge::uniform(
        &Rubric::for_gate(GateNumber::One),
        82.0,
    )));
    let knowledge = Arc::new(MemoryKnowledgeLookup::unavailable());
    let response = evaluator(judge.clone(), knowledge.clone(), Arc::new(MemoryResultSink::new()))
        .evaluate(&request(GateNumber::One, vec![deliverable("D5", Some(0.74))]))
        .await
        .unwrap();

    assert!(response.result.passed);
    assert_eq!(knowledge.calls(), 1);
    assert_eq!(judge.calls(), 1);
    assert!(judge.requests()[0].comparisons.is_empty());
}

#[tokio::test]
async fn gate_one_forwards_comparisons_to_the_judge() {
    let judge = Arc::new(ScriptedJudge::returning(ScriptedJudge::uniform(
        &Rubric::for_gate(GateNumber::One),
        82.0,
    )));
    let knowledge = Arc::new(MemoryKnowledgeLookup::new());
    knowledge.insert("p-7", json!({ "case": "regional retail", "crv": 71 }));

    evaluator(judge.clone(), knowledge, Arc::new(MemoryResultSink::new()))
        .evaluate(&request(GateNumber::One, vec![deliverable("D5", Some(80.0))]))
        .await
        .unwrap();

    let sent = judge.requests();
    assert_eq!(sent[0].comparisons.len(), 1);
    assert_eq!(sent[0].artifact_code, "D5");
    assert_eq!(sent[0].confidence_score, Some(80.0));
}

#[tokio::test]
async fn later_gate_warns_when_previous_gate_not_passed() {
    let judge = Arc::new(ScriptedJudge::returning(ScriptedJudge::uniform(
        &Rubric::for_gate(GateNumber::Two),
        90.0,
    )));
    let response = evaluator(
        judge,
        Arc::new(MemoryKnowledgeLookup::new()),
        Arc::new(MemoryResultSink::new()),
    )
    .evaluate(&request(GateNumber::Two, vec![deliverable("D7", None)]))
    .await
    .unwrap();

    // The warning never changes the verdict.
    assert!(response.result.passed);
    assert_eq!(response.result.warnings, vec!["Gate 1 ainda não foi avaliado"]);
}

#[tokio::test]
async fn result_is_mirrored_onto_the_project_record() {
    let projects = Arc::new(MemoryEntityStore::new());
    projects.insert_json(EntityKind::Project, "p-7", json!({ "name": "Expansion" }));

    let eval = evaluator(
        Arc::new(ScriptedJudge::failing("unused")),
        Arc::new(MemoryKnowledgeLookup::new()),
        Arc::new(MemoryResultSink::new()),
    )
    .with_project_store(projects.clone());
    eval.evaluate(&request(GateNumber::Zero, vec![])).await.unwrap();

    let record = projects
        .get(&TargetRef::new(EntityKind::Project, "p-7"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.fields["stage_gate_0"]["passed"], json!(false));
    assert_eq!(record.fields["name"], json!("Expansion"));
}
