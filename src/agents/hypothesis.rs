//! Hypothesis generator agent.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::base::{context_text, unit_interval};
use super::{AgentContext, AgentResult, SpecialistAgent, WorkingMemory};
use crate::ai::{format_hypothesis_request, parse_structured, AiProvider, HYPOTHESIS_SYSTEM_PROMPT};

/// Confidence of a run that produced at least one hypothesis.
pub const HYPOTHESES_FOUND_CONFIDENCE: f64 = 0.8;
/// Confidence of a run that produced none.
pub const NO_HYPOTHESES_CONFIDENCE: f64 = 0.3;

/// Area a hypothesis concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HypothesisCategory {
    Pricing,
    Quantity,
    Timing,
    Vendor,
    Compliance,
    Other,
}

impl HypothesisCategory {
    /// Parse leniently; unknown labels become `Other`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "pricing" => Self::Pricing,
            "quantity" => Self::Quantity,
            "timing" => Self::Timing,
            "vendor" => Self::Vendor,
            "compliance" => Self::Compliance,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Parse leniently; unknown labels become `Medium`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

/// A claimed potential discrepancy awaiting verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub description: String,
    pub category: HypothesisCategory,
    pub severity: Severity,
    pub evidence_needed: Vec<String>,
    pub initial_confidence: f64,
}

impl Hypothesis {
    /// Build from one model-produced object, filling missing fields.
    ///
    /// `position` is 1-based and used for the fallback id `H001`, `H002`...
    #[must_use]
    pub fn from_value(value: &Value, position: usize) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str);
        let id = match value.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("H{position:03}"),
        };
        let evidence_needed = value
            .get("evidence_needed")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map_or_else(|| item.to_string(), String::from))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id,
            description: text("description").unwrap_or_default().to_string(),
            category: text("category").map_or(HypothesisCategory::Other, HypothesisCategory::from_label),
            severity: text("severity").map_or(Severity::Medium, Severity::from_label),
            evidence_needed,
            initial_confidence: unit_interval(value.get("initial_confidence"), 0.5),
        }
    }
}

/// Extract the hypothesis list from a parsed response.
///
/// Non-object entries are skipped.
#[must_use]
pub fn parse_hypotheses(response: &Value) -> Vec<Hypothesis> {
    response
        .get("hypotheses")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .enumerate()
                .map(|(i, item)| Hypothesis::from_value(item, i + 1))
                .collect()
        })
        .unwrap_or_default()
}

/// Generates hypotheses about discrepancies from documents and transaction
/// data.
pub struct HypothesisAgent {
    provider: Arc<dyn AiProvider>,
    memory: WorkingMemory,
}

impl HypothesisAgent {
    pub const NAME: &'static str = "hypothesis_generator";

    #[must_use]
    pub fn new(provider: Arc<dyn AiProvider>, memory_limit: usize) -> Self {
        Self {
            provider,
            memory: WorkingMemory::new(memory_limit),
        }
    }
}

#[async_trait]
impl SpecialistAgent for HypothesisAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Generate hypotheses about potential discrepancies in audit data"
    }

    async fn run(&mut self, task: &str, context: &AgentContext) -> AgentResult {
        let prompt = format_hypothesis_request(
            task,
            context_text(context, "documents").as_deref(),
            context_text(context, "transaction_data").as_deref(),
            context_text(context, "previous_findings").as_deref(),
        );

        let raw = match self.provider.generate(HYPOTHESIS_SYSTEM_PROMPT, &prompt).await {
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

        let hypotheses = parse_hypotheses(&response);
        let categories: BTreeSet<HypothesisCategory> =
            hypotheses.iter().map(|h| h.category).collect();
        self.memory.push(json!({
            "task": task,
            "hypotheses_count": hypotheses.len(),
            "categories": categories,
        }));

        let confidence = if hypotheses.is_empty() {
            NO_HYPOTHESES_CONFIDENCE
        } else {
            HYPOTHESES_FOUND_CONFIDENCE
        };
        let reasoning = response
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut metadata = Map::new();
        metadata.insert("hypothesis_count".to_string(), json!(hypotheses.len()));
        metadata.insert(
            "areas_not_covered".to_string(),
            response
                .get("areas_not_covered")
                .cloned()
                .unwrap_or_else(|| json!([])),
        );

        tracing::info!(
            agent = Self::NAME,
            count = hypotheses.len(),
            "Generated hypotheses"
        );
        AgentResult::success(Self::NAME, json!(hypotheses), confidence, reasoning, metadata)
    }

    fn memory(&self) -> &WorkingMemory {
        &self.memory
    }

    fn clear_memory(&mut self) {
        self.memory.clear();
    }
}
