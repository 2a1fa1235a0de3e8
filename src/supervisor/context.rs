//! Per-task shared context between tools and agents.

use serde_json::{Map, Value};

/// Keys of the shared context. Each key has a single writer tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKey {
    Documents,
    TransactionData,
    Hypotheses,
    HypothesisReasoning,
    HypothesisIds,
    Verifications,
    VerificationReasoning,
    VerifiedHypotheses,
    Evidence,
    DomainKnowledge,
}

impl ContextKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::TransactionData => "transaction_data",
            Self::Hypotheses => "hypotheses",
            Self::HypothesisReasoning => "hypothesis_reasoning",
            Self::HypothesisIds => "hypothesis_ids",
            Self::Verifications => "verifications",
            Self::VerificationReasoning => "verification_reasoning",
            Self::VerifiedHypotheses => "verified_hypotheses",
            Self::Evidence => "evidence",
            Self::DomainKnowledge => "domain_knowledge",
        }
    }
}

/// Mutable key/value store cleared at the start of every task.
///
/// Reads of absent keys yield empty values instead of failing. Every write
/// replaces one key in full.
#[derive(Debug, Clone)]
pub struct SharedContext {
    values: Map<String, Value>,
    max_text_chars: usize,
}

impl SharedContext {
    /// `max_text_chars` bounds the accumulated `documents` and `evidence`.
    #[must_use]
    pub fn new(max_text_chars: usize) -> Self {
        Self {
            values: Map::new(),
            max_text_chars,
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: ContextKey) -> Option<&Value> {
        self.values.get(key.as_str())
    }

    pub fn set(&mut self, key: ContextKey, value: Value) {
        self.values.insert(key.as_str().to_string(), value);
    }

    /// Text form of a value; strings verbatim, other values as JSON, absent as "".
    #[must_use]
    pub fn text(&self, key: ContextKey) -> String {
        match self.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => serde_json::to_string_pretty(other).unwrap_or_default(),
        }
    }

    /// Array value, or empty when absent or not an array.
    #[must_use]
    pub fn list(&self, key: ContextKey) -> &[Value] {
        match self.get(key) {
            Some(Value::Array(items)) => items,
            _ => &[],
        }
    }

    /// Append to a text key, dropping the oldest text beyond the bound.
    pub fn append_text(&mut self, key: ContextKey, text: &str) {
        let mut combined = self.text(key);
        if !combined.is_empty() {
            combined.push_str("\n\n");
        }
        combined.push_str(text);

        let total = combined.chars().count();
        if total > self.max_text_chars {
            let skip = total - self.max_text_chars;
            let start = combined
                .char_indices()
                .nth(skip)
                .map_or(combined.len(), |(i, _)| i);
            combined = combined[start..].to_string();
        }
        self.set(key, Value::String(combined));
    }

    /// Add hypothesis ids to the task's record of ids seen, keeping order.
    pub fn record_hypothesis_ids<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        let mut known: Vec<Value> = self.list(ContextKey::HypothesisIds).to_vec();
        for id in ids {
            if !known.iter().any(|k| k.as_str() == Some(id)) {
                known.push(Value::String(id.to_string()));
            }
        }
        self.set(ContextKey::HypothesisIds, Value::Array(known));
    }
}
