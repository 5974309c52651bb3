//! Agent lifecycle events.
//!
//! Events are purely observational: the turn emits them at fixed points and
//! never consults the sink's answer. Serialized with a kebab-case `type` tag
//! so log consumers see `{"type":"agent-start", ...}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolkitError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    /// Emitted after input guardrails pass.
    AgentStart { agent: String, round: u32 },

    /// Emitted after output guardrails pass, immediately before returning.
    AgentEnd { agent: String, round: u32 },

    /// Emitted by the delegating agent before the target agent runs.
    AgentHandoff {
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Emitted before a resolved tool executes.
    #[serde(rename_all = "camelCase")]
    ToolStart {
        agent: String,
        tool_name: String,
        args: Value,
    },

    /// Emitted after a resolved tool executes successfully.
    #[serde(rename_all = "camelCase")]
    ToolEnd {
        agent: String,
        tool_name: String,
        result: Value,
    },

    /// Emitted once when a turn fails, before the error reaches the caller.
    AgentError {
        agent: String,
        /// `ToolkitError::kind()` of the triggering condition.
        kind: String,
        message: String,
    },
}

impl AgentEvent {
    /// Build an `agent-error` event from the condition that failed the turn.
    pub fn error(agent: impl Into<String>, error: &ToolkitError) -> Self {
        Self::AgentError {
            agent: agent.into(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }

    /// The kebab-case tag of this event, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentStart { .. } => "agent-start",
            Self::AgentEnd { .. } => "agent-end",
            Self::AgentHandoff { .. } => "agent-handoff",
            Self::ToolStart { .. } => "tool-start",
            Self::ToolEnd { .. } => "tool-end",
            Self::AgentError { .. } => "agent-error",
        }
    }
}
