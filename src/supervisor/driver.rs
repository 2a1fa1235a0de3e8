//! Drivers deciding the next tool call.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{tool_catalogue, SupervisorError};
use crate::ai::{
    format_driver_request, parse_structured, AiProvider, TranscriptCompressor, TranscriptEntry,
    DRIVER_SYSTEM_PROMPT,
};

/// What the driver wants to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverStep {
    CallTool { name: String, args: Value },
    Finish { summary: String },
}

/// Anything that can steer an investigation, model-backed or scripted.
#[async_trait]
pub trait ToolDriver: Send {
    /// Choose the next step given the transcript so far.
    async fn next_step(
        &mut self,
        task: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<DriverStep, SupervisorError>;
}

/// Replays a fixed list of tool calls, then finishes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    calls: VecDeque<(String, Value)>,
    summary: String,
}

impl ScriptedDriver {
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            calls: VecDeque::new(),
            summary: summary.into(),
        }
    }

    /// Append a tool call to the script.
    #[must_use]
    pub fn call(mut self, name: impl Into<String>, args: Value) -> Self {
        self.calls.push_back((name.into(), args));
        self
    }

    /// Calls not yet replayed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.calls.len()
    }
}

#[async_trait]
impl ToolDriver for ScriptedDriver {
    async fn next_step(
        &mut self,
        _task: &str,
        _transcript: &[TranscriptEntry],
    ) -> Result<DriverStep, SupervisorError> {
        Ok(match self.calls.pop_front() {
            Some((name, args)) => DriverStep::CallTool { name, args },
            None => DriverStep::Finish {
                summary: self.summary.clone(),
            },
        })
    }
}

/// Asks the model for the next step.
pub struct ModelDriver {
    provider: Arc<dyn AiProvider>,
    compressor: TranscriptCompressor,
    catalogue: String,
}

impl ModelDriver {
    #[must_use]
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self {
            provider,
            compressor: TranscriptCompressor::default(),
            catalogue: tool_catalogue(),
        }
    }
}

#[async_trait]
impl ToolDriver for ModelDriver {
    async fn next_step(
        &mut self,
        task: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<DriverStep, SupervisorError> {
        let history = self.compressor.compress(transcript);
        let prompt = format_driver_request(task, &self.catalogue, &history);
        let raw = self
            .provider
            .generate(DRIVER_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| SupervisorError::Driver(e.to_string()))?;
        Ok(parse_driver_reply(&raw))
    }
}

/// Interpret a model reply as a step.
///
/// `{"tool": ..., "args": {...}}` calls a tool, `{"final": ...}` finishes.
/// Anything else is taken as the final answer verbatim.
#[must_use]
pub fn parse_driver_reply(raw: &str) -> DriverStep {
    if let Ok(reply) = parse_structured::<Value>(raw) {
        if let Some(name) = reply.get("tool").and_then(Value::as_str) {
            return DriverStep::CallTool {
                name: name.to_string(),
                args: reply
                    .get("args")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            };
        }
        if let Some(summary) = reply.get("final") {
            return DriverStep::Finish {
                summary: summary
                    .as_str()
                    .map_or_else(|| summary.to_string(), String::from),
            };
        }
    }
    tracing::debug!("Driver reply is not a structured step, treating as final");
    DriverStep::Finish {
        summary: raw.trim().to_string(),
    }
}
