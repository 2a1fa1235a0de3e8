//! Audit report synthesis from the shared context.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ContextKey, SharedContext};

/// Confidence reported when no verification carries one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisContribution {
    pub hypotheses_generated: usize,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierContribution {
    pub verifications_completed: usize,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentContributions {
    pub hypothesis_agent: HypothesisContribution,
    pub verifier_agent: VerifierContribution,
}

/// Final output of one investigation task.
///
/// Field names are stable; report renderers key off them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub transaction_id: String,
    pub summary: String,
    pub confirmed_issues: Vec<Value>,
    pub potential_issues: Vec<Value>,
    pub recommendations: BTreeSet<String>,
    pub confidence_score: f64,
    pub agent_contributions: AgentContributions,
}

impl AuditReport {
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Hypothesis ids recorded at any point during the task.
fn known_hypothesis_ids(context: &SharedContext) -> HashSet<String> {
    let recorded = context
        .list(ContextKey::HypothesisIds)
        .iter()
        .filter_map(Value::as_str)
        .map(String::from);
    let judged = context
        .list(ContextKey::VerifiedHypotheses)
        .iter()
        .filter_map(|h| h.get("id"))
        .filter_map(id_text);
    recorded.chain(judged).collect()
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build the report from the final context snapshot.
///
/// Confirmed verifications become issues and contribute recommendations;
/// inconclusive ones become potential issues; any other verdict lands in
/// neither. A verification naming an id never recorded this task is
/// excluded from both, even when no hypothesis was recorded at all.
/// Verifications without an id are classified by verdict alone.
#[must_use]
pub fn build_report(transaction_id: &str, summary: &str, context: &SharedContext) -> AuditReport {
    let verifications = context.list(ContextKey::Verifications);
    let known_ids = known_hypothesis_ids(context);

    let mut confirmed_issues = Vec::new();
    let mut potential_issues = Vec::new();
    let mut recommendations = BTreeSet::new();
    let mut confidences = Vec::new();

    for verification in verifications.iter().filter(|v| v.is_object()) {
        confidences.push(
            verification
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_CONFIDENCE),
        );

        if let Some(id) = verification.get("hypothesis_id").and_then(id_text) {
            if !known_ids.contains(&id) {
                tracing::warn!(hypothesis_id = %id, "Verification references unknown hypothesis");
                continue;
            }
        }

        match verification.get("verdict").and_then(Value::as_str) {
            Some("confirmed") => {
                if let Some(recs) = verification.get("recommendations").and_then(Value::as_array) {
                    recommendations.extend(recs.iter().filter_map(Value::as_str).map(String::from));
                }
                confirmed_issues.push(verification.clone());
            }
            Some("inconclusive") => potential_issues.push(verification.clone()),
            _ => {}
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let confidence_score = if confidences.is_empty() {
        DEFAULT_CONFIDENCE
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    let report = AuditReport {
        transaction_id: transaction_id.to_string(),
        summary: summary.to_string(),
        confirmed_issues,
        potential_issues,
        recommendations,
        confidence_score,
        agent_contributions: AgentContributions {
            hypothesis_agent: HypothesisContribution {
                hypotheses_generated: context.list(ContextKey::Hypotheses).len(),
                reasoning: context.text(ContextKey::HypothesisReasoning),
            },
            verifier_agent: VerifierContribution {
                verifications_completed: verifications.len(),
                reasoning: context.text(ContextKey::VerificationReasoning),
            },
        },
    };

    tracing::info!(
        transaction_id = %report.transaction_id,
        confirmed = report.confirmed_issues.len(),
        potential = report.potential_issues.len(),
        confidence = report.confidence_score,
        "Built audit report"
    );
    report
}
