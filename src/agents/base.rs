//! Specialist agent contract and shared result types.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::ai::{truncate, AiError};

/// Context handed to an agent: a JSON object keyed like the shared context.
pub type AgentContext = Map<String, Value>;

/// Characters of raw model output kept on a parse failure.
pub const RAW_OUTPUT_PREVIEW_CHARS: usize = 500;

/// Confidence assigned when the model output could not be parsed.
pub const PARTIAL_CONFIDENCE: f64 = 0.2;

/// Outcome class of one agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Success,
    Partial,
    Failed,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        })
    }
}

/// Result returned by every specialist agent. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResult {
    pub agent_name: String,
    pub status: AgentStatus,
    pub data: Value,
    pub confidence: f64,
    pub reasoning: String,
    pub metadata: Map<String, Value>,
}

impl AgentResult {
    /// A successful run.
    #[must_use]
    pub fn success(
        agent_name: &str,
        data: Value,
        confidence: f64,
        reasoning: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            status: AgentStatus::Success,
            data,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            metadata,
        }
    }

    /// The model answered but its output could not be parsed.
    #[must_use]
    pub fn partial(agent_name: &str, error: &AiError, raw_output: &str) -> Self {
        let preview: String = raw_output.chars().take(RAW_OUTPUT_PREVIEW_CHARS).collect();
        let mut metadata = Map::new();
        metadata.insert("error".to_string(), Value::String(error.to_string()));
        metadata.insert("raw_output".to_string(), Value::String(preview.clone()));
        Self {
            agent_name: agent_name.to_string(),
            status: AgentStatus::Partial,
            data: Value::Array(Vec::new()),
            confidence: PARTIAL_CONFIDENCE,
            reasoning: format!("JSON parse error: {error}. Raw output: {preview}"),
            metadata,
        }
    }

    /// The run failed before any output could be used.
    #[must_use]
    pub fn failed(agent_name: &str, error: &AiError) -> Self {
        let mut metadata = Map::new();
        metadata.insert("error".to_string(), Value::String(error.to_string()));
        Self {
            agent_name: agent_name.to_string(),
            status: AgentStatus::Failed,
            data: Value::Array(Vec::new()),
            confidence: 0.0,
            reasoning: format!("{agent_name} failed: {error}"),
            metadata,
        }
    }

    /// Pretty JSON for returning to the reasoning loop.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!(
                "{{\"agent_name\": \"{}\", \"status\": \"{}\", \"error\": \"{}\"}}",
                self.agent_name,
                self.status,
                truncate(&e.to_string(), 200)
            )
        })
    }
}

/// Append-only audit trail of an agent's runs, capped at `limit` entries.
///
/// The oldest entry is evicted when full. Entries are never fed back into
/// prompts.
#[derive(Debug, Clone)]
pub struct WorkingMemory {
    entries: VecDeque<Value>,
    limit: usize,
}

impl WorkingMemory {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    pub fn push(&mut self, entry: Value) {
        if self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A specialist that wraps exactly one model call per run.
#[async_trait]
pub trait SpecialistAgent: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the agent. Failures are reported inside the result.
    async fn run(&mut self, task: &str, context: &AgentContext) -> AgentResult;

    fn memory(&self) -> &WorkingMemory;

    fn clear_memory(&mut self);
}

/// Text value of `key`, if present and non-empty.
///
/// Strings are used as-is; other JSON values are pretty-printed.
#[must_use]
pub fn context_text(context: &AgentContext, key: &str) -> Option<String> {
    match context.get(key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(a) if a.is_empty() => None,
        other => Some(serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())),
    }
}

/// Clamp a JSON number into `[0, 1]`, using `default` when absent.
#[must_use]
pub fn unit_interval(value: Option<&Value>, default: f64) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(default)
        .clamp(0.0, 1.0)
}
