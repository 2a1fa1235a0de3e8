//! Task state machine.

use serde::{Deserialize, Serialize};

/// Current state of an investigation task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    #[default]
    Idle,
    ContextCleared,
    Investigating,
    ReportBuilt,
}

/// State machine for tracking task progress.
#[derive(Debug, Clone, Default)]
pub struct TaskStateMachine {
    state: TaskState,
    tool_calls: usize,
    agent_invocations: usize,
}

impl TaskStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn transition(&mut self, new_state: TaskState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "State transition");
        self.state = new_state;
    }

    /// Zero the counters for a new task.
    pub fn reset(&mut self) {
        self.tool_calls = 0;
        self.agent_invocations = 0;
    }

    pub fn record_tool_call(&mut self) {
        self.tool_calls = self.tool_calls.saturating_add(1);
    }

    pub fn record_agent_invocation(&mut self) {
        self.agent_invocations = self.agent_invocations.saturating_add(1);
    }

    #[must_use]
    pub fn stats(&self) -> TaskStats {
        TaskStats {
            tool_calls: self.tool_calls,
            agent_invocations: self.agent_invocations,
        }
    }
}

/// Task statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub tool_calls: usize,
    pub agent_invocations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_reset() {
        let mut sm = TaskStateMachine::new();
        assert_eq!(sm.state(), TaskState::Idle);
        sm.record_tool_call();
        sm.record_tool_call();
        sm.record_agent_invocation();
        assert_eq!(
            sm.stats(),
            TaskStats {
                tool_calls: 2,
                agent_invocations: 1
            }
        );
        sm.transition(TaskState::ReportBuilt);
        sm.reset();
        assert_eq!(sm.stats().tool_calls, 0);
        assert_eq!(sm.state(), TaskState::ReportBuilt);
    }
}
