//! Hypothesis verifier agent.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::base::{context_text, unit_interval};
use super::{AgentContext, AgentResult, SpecialistAgent, WorkingMemory};
use crate::ai::{format_verifier_request, parse_structured, AiProvider, VERIFIER_SYSTEM_PROMPT};

/// Confidence of a run whose response held no verifications.
pub const NO_VERIFICATIONS_CONFIDENCE: f64 = 0.3;

/// Outcome of verifying one hypothesis.
///
/// Labels outside the three known verdicts are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Confirmed,
    Refuted,
    Inconclusive,
    Other(String),
}

impl Verdict {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Refuted => "refuted",
            Self::Inconclusive => "inconclusive",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Verdict {
    fn from(label: String) -> Self {
        match label.as_str() {
            "confirmed" => Self::Confirmed,
            "refuted" => Self::Refuted,
            "inconclusive" => Self::Inconclusive,
            _ => Self::Other(label),
        }
    }
}

impl From<&str> for Verdict {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<Verdict> for String {
    fn from(verdict: Verdict) -> Self {
        verdict.as_str().to_string()
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub hypothesis_id: Option<String>,
    pub verdict: Verdict,
    pub confidence: f64,
    pub recommendations: Vec<String>,
    pub reasoning: String,
}

impl Verification {
    /// Build from one model-produced object.
    ///
    /// A missing verdict is treated as inconclusive; a missing confidence
    /// as 0.5.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let hypothesis_id = match value.get("hypothesis_id") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let verdict = value
            .get("verdict")
            .and_then(Value::as_str)
            .map_or(Verdict::Inconclusive, |v| Verdict::from(v.trim().to_lowercase()));
        let recommendations = value
            .get("recommendations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            hypothesis_id,
            verdict,
            confidence: unit_interval(value.get("confidence"), 0.5),
            recommendations,
            reasoning: value
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Extract the verification list from a parsed response.
#[must_use]
pub fn parse_verifications(response: &Value) -> Vec<Verification> {
    response
        .get("verifications")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .map(Verification::from_value)
                .collect()
        })
        .unwrap_or_default()
}

/// Judges hypotheses against gathered evidence and domain knowledge.
pub struct VerifierAgent {
    provider: Arc<dyn AiProvider>,
    memory: WorkingMemory,
}

impl VerifierAgent {
    pub const NAME: &'static str = "hypothesis_verifier";

    #[must_use]
    pub fn new(provider: Arc<dyn AiProvider>, memory_limit: usize) -> Self {
        Self {
            provider,
            memory: WorkingMemory::new(memory_limit),
        }
    }
}

#[async_trait]
impl SpecialistAgent for VerifierAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Verify hypotheses against evidence and domain knowledge"
    }

    async fn run(&mut self, task: &str, context: &AgentContext) -> AgentResult {
        let hypotheses = context
            .get("hypotheses")
            .cloned()
            .unwrap_or_else(|| json!([]));
        let prompt = format_verifier_request(
            task,
            &hypotheses,
            context_text(context, "evidence").as_deref(),
            context_text(context, "domain_knowledge").as_deref(),
        );

        let raw = match self.provider.generate(VERIFIER_SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(agent = Self::NAME, error = %e, "Model call failed");
                return AgentResult::failed(Self::NAME, &e);
            }
        };

        let response: Value = match parse_structured(&raw) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(agent = Self::NAME, error = %e, "Unparseable model output");
                return AgentResult::partial(Self::NAME, &e, &raw);
            }
        };

        let verifications = parse_verifications(&response);
        #[allow(clippy::cast_precision_loss)]
        let confidence = if verifications.is_empty() {
            NO_VERIFICATIONS_CONFIDENCE
        } else {
            verifications.iter().map(|v| v.confidence).sum::<f64>() / verifications.len() as f64
        };

        let verdicts: Vec<&str> = verifications.iter().map(|v| v.verdict.as_str()).collect();
        self.memory.push(json!({
            "task": task,
            "verification_count": verifications.len(),
            "verdicts": verdicts,
        }));

        let mut metadata = Map::new();
        metadata.insert(
            "verification_count".to_string(),
            json!(verifications.len()),
        );
        metadata.insert(
            "overall_assessment".to_string(),
            response
                .get("overall_assessment")
                .cloned()
                .unwrap_or_else(|| json!("")),
        );
        let reasoning = response
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        tracing::info!(
            agent = Self::NAME,
            count = verifications.len(),
            confidence,
            "Verified hypotheses"
        );
        AgentResult::success(Self::NAME, json!(verifications), confidence, reasoning, metadata)
    }

    fn memory(&self) -> &WorkingMemory {
        &self.memory
    }

    fn clear_memory(&mut self) {
        self.memory.clear();
    }
}
