//! End-to-end tests of the investigation loop with a mock model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use audit_investigator::ai::{AiError, AiProvider, HYPOTHESIS_SYSTEM_PROMPT, VERIFIER_SYSTEM_PROMPT};
use audit_investigator::config::{ChunkingConfig, InvestigatorConfig};
use audit_investigator::evidence::{ingest_text, DocumentRegistry};
use audit_investigator::knowledge::load_sample_knowledge;
use audit_investigator::supervisor::{
    ContextKey, DriverStep, ModelDriver, ScriptedDriver, Supervisor, SupervisorError,
    SupervisorEvent, TaskState, ToolDriver,
};

const HYPOTHESES: &str = r#"```json
{"hypotheses": [
  {"id": "H001", "description": "Unit price exceeds market band", "category": "pricing", "severity": "high", "evidence_needed": ["market price"], "initial_confidence": 0.6},
  {"id": "H002", "description": "Order split below approval limit", "category": "compliance", "severity": "medium", "evidence_needed": ["approval log"], "initial_confidence": 0.4}
], "reasoning": "Invoice price is 50% above contract.", "areas_not_covered": []}
```"#;

const VERIFICATIONS: &str = r#"{"verifications": [
  {"hypothesis_id": "H001", "verdict": "confirmed", "confidence": 0.9, "recommendations": ["Recover the overcharge", "Review vendor pricing"], "reasoning": "Invoice $150 vs contract $100."},
  {"hypothesis_id": "H002", "verdict": "inconclusive", "confidence": 0.4, "recommendations": ["Request approval log"], "reasoning": "No approval records."}
], "reasoning": "One confirmed, one open.", "overall_assessment": "Overcharge found"}"#;

/// Answers like the two specialists, keyed by system prompt.
#[derive(Default)]
struct MockModel {
    calls: AtomicUsize,
}

#[async_trait]
impl AiProvider for MockModel {
    async fn generate(&self, system: &str, _user: &str) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if system == HYPOTHESIS_SYSTEM_PROMPT {
            Ok(HYPOTHESES.to_string())
        } else if system == VERIFIER_SYSTEM_PROMPT {
            Ok(VERIFICATIONS.to_string())
        } else {
            Ok(r#"{"final": "done"}"#.to_string())
        }
    }
}

fn registry() -> DocumentRegistry {
    let mut registry = DocumentRegistry::new();
    let chunking = ChunkingConfig::default();
    ingest_text(
        &mut registry,
        "contract.txt",
        "docs/contract.txt",
        "Contract CT-77 with Acme Trading Inc. fixes the unit price at $100.",
        &chunking,
    )
    .unwrap();
    ingest_text(
        &mut registry,
        "invoice.txt",
        "docs/invoice.txt",
        "Invoice INV-2024-001 dated 2024-03-01 bills 100 units at $150.",
        &chunking,
    )
    .unwrap();
    registry
}

fn supervisor(model: Arc<MockModel>) -> Supervisor {
    Supervisor::new(
        Arc::new(registry()),
        Arc::new(load_sample_knowledge().unwrap()),
        model,
        InvestigatorConfig::default(),
    )
}

fn full_script() -> ScriptedDriver {
    ScriptedDriver::new("Overcharge on INV-2024-001 confirmed.")
        .call("list_indexed_files", json!({}))
        .call("search_all_files", json!({"query": "unit price"}))
        .call("read_file", json!({"file_id": "invoice.txt", "chunk": 0}))
        .call("extract_data", json!({"source": "invoice.txt", "extraction_type": "amounts"}))
        .call(
            "analyze_data",
            json!({"data": "[100, 150]", "analysis_type": "compare_values"}),
        )
        .call("lookup_knowledge", json!({"category": "audit_rules", "query": "price deviation"}))
        .call("generate_hypotheses", json!({"task": "Check invoice pricing"}))
        .call("verify_hypotheses", json!({"task": "Verify pricing hypotheses"}))
}

#[tokio::test]
async fn test_full_investigation_report() {
    let model = Arc::new(MockModel::default());
    let mut sup = supervisor(Arc::clone(&model));
    let mut driver = full_script();

    let report = sup
        .run("Investigate INV-2024-001", "INV-2024-001", &mut driver)
        .await
        .unwrap();

    assert_eq!(report.transaction_id, "INV-2024-001");
    assert_eq!(report.summary, "Overcharge on INV-2024-001 confirmed.");
    assert_eq!(report.confirmed_issues.len(), 1);
    assert_eq!(report.potential_issues.len(), 1);
    assert!((report.confidence_score - 0.65).abs() < 1e-9);
    assert_eq!(
        report.recommendations.iter().cloned().collect::<Vec<_>>(),
        vec!["Recover the overcharge", "Review vendor pricing"]
    );
    assert_eq!(report.agent_contributions.hypothesis_agent.hypotheses_generated, 2);
    assert_eq!(report.agent_contributions.verifier_agent.verifications_completed, 2);
    assert_eq!(
        report.agent_contributions.hypothesis_agent.reasoning,
        "Invoice price is 50% above contract."
    );

    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    assert_eq!(sup.state(), TaskState::ReportBuilt);
    assert_eq!(sup.stats().tool_calls, 8);
    assert_eq!(sup.stats().agent_invocations, 2);
    assert!(sup.context().text(ContextKey::Evidence).contains("unit price"));
    assert!(sup.context().text(ContextKey::DomainKnowledge).contains("20%"));
}

#[tokio::test]
async fn test_context_does_not_leak_between_tasks() {
    let model = Arc::new(MockModel::default());
    let mut sup = supervisor(model);

    let first = sup.run("first", "TX-1", &mut full_script()).await.unwrap();
    assert_eq!(first.agent_contributions.hypothesis_agent.hypotheses_generated, 2);

    let mut idle = ScriptedDriver::new("nothing to do");
    let second = sup.run("second", "", &mut idle).await.unwrap();

    assert_eq!(second.transaction_id, "UNKNOWN");
    assert_eq!(second.agent_contributions.hypothesis_agent.hypotheses_generated, 0);
    assert!(second.confirmed_issues.is_empty());
    assert!(second.recommendations.is_empty());
    assert!((second.confidence_score - 0.5).abs() < 1e-9);
    assert!(sup.context().is_empty());
}

#[tokio::test]
async fn test_unknown_file_id_recovers_in_turn() {
    let mut sup = supervisor(Arc::new(MockModel::default()));
    let out = sup
        .dispatch("search_file", &json!({"file_id": "ledger.xlsx", "query": "total"}))
        .await;
    assert!(out.contains("Unknown file_id: ledger.xlsx"));
    assert!(out.contains("contract.txt"));
    assert!(out.contains("invoice.txt"));
}

#[tokio::test]
async fn test_verify_with_explicit_hypotheses_param() {
    let mut sup = supervisor(Arc::new(MockModel::default()));
    let out = sup
        .dispatch(
            "verify_hypotheses",
            &json!({
                "task": "verify",
                "hypotheses": r#"[{"id": "H001"}, {"id": "H002"}]"#,
                "evidence": "Invoice $150, contract $100"
            }),
        )
        .await;
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(
        sup.context().get(ContextKey::VerifiedHypotheses),
        Some(&json!([{"id": "H001"}, {"id": "H002"}]))
    );
}

#[tokio::test]
async fn test_events_arrive_in_order() {
    let mut sup = supervisor(Arc::new(MockModel::default()));
    let mut driver = ScriptedDriver::new("finished").call("list_indexed_files", json!({}));
    let (tx, mut rx) = mpsc::unbounded_channel();

    sup.run_with_events("task", "TX-2", &mut driver, &tx)
        .await
        .unwrap();
    drop(tx);

    let mut kinds = Vec::new();
    while let Some(event) = rx.recv().await {
        kinds.push(match event {
            SupervisorEvent::TaskStarted { .. } => "start",
            SupervisorEvent::ToolCall { .. } => "call",
            SupervisorEvent::ToolResult { .. } => "result",
            SupervisorEvent::ModelMessage(_) => "message",
            SupervisorEvent::ReportBuilt(_) => "report",
        });
    }
    assert_eq!(kinds, vec!["start", "call", "result", "message", "report"]);
}

/// Never finishes on its own.
struct Endless;

#[async_trait]
impl ToolDriver for Endless {
    async fn next_step(
        &mut self,
        _task: &str,
        _transcript: &[audit_investigator::ai::TranscriptEntry],
    ) -> Result<DriverStep, SupervisorError> {
        Ok(DriverStep::CallTool {
            name: "list_indexed_files".to_string(),
            args: json!({}),
        })
    }
}

#[tokio::test]
async fn test_step_limit_ends_the_loop() {
    let mut config = InvestigatorConfig::default();
    config.supervisor.max_steps = 3;
    let mut sup = Supervisor::new(
        Arc::new(registry()),
        Arc::new(load_sample_knowledge().unwrap()),
        Arc::new(MockModel::default()),
        config,
    );

    let report = sup.run("loop", "TX-3", &mut Endless).await.unwrap();
    assert_eq!(sup.stats().tool_calls, 3);
    assert!(report.summary.contains("limit of 3"));
}

#[tokio::test]
async fn test_cancelled_task_still_reports() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut sup = supervisor(Arc::new(MockModel::default())).with_cancellation(cancel);

    let report = sup.run("cancelled", "TX-4", &mut full_script()).await.unwrap();
    assert_eq!(sup.stats().tool_calls, 0);
    assert!(report.summary.contains("cancelled"));
}

#[tokio::test]
async fn test_model_driver_with_final_answer() {
    let model = Arc::new(MockModel::default());
    let mut sup = supervisor(Arc::clone(&model));
    let mut driver = ModelDriver::new(model);

    let report = sup.run("quick look", "TX-5", &mut driver).await.unwrap();
    assert_eq!(report.summary, "done");
}

#[tokio::test]
async fn test_verifications_without_hypotheses_add_no_findings() {
    let model = Arc::new(MockModel::default());
    let mut sup = supervisor(Arc::clone(&model));
    let mut driver = ScriptedDriver::new("verified only")
        .call("verify_hypotheses", json!({"task": "Verify pricing"}));

    let report = sup.run("verify only", "TX-6", &mut driver).await.unwrap();

    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.agent_contributions.verifier_agent.verifications_completed, 2);
    assert!(report.confirmed_issues.is_empty());
    assert!(report.potential_issues.is_empty());
    assert!(report.recommendations.is_empty());
}

#[tokio::test]
async fn test_ids_from_previous_task_are_unknown() {
    let mut sup = supervisor(Arc::new(MockModel::default()));

    let first = sup.run("first", "TX-7", &mut full_script()).await.unwrap();
    assert_eq!(first.confirmed_issues.len(), 1);

    // The verifier cites H001 and H002, which only exist in the first task.
    let mut driver = ScriptedDriver::new("re-verified")
        .call("verify_hypotheses", json!({"task": "Verify again"}));
    let second = sup.run("second", "TX-8", &mut driver).await.unwrap();

    assert!(second.confirmed_issues.is_empty());
    assert!(second.potential_issues.is_empty());
    assert!(second.recommendations.is_empty());
    assert_eq!(second.agent_contributions.hypothesis_agent.hypotheses_generated, 0);
}
