//! Runtime error types for the agentkit turn pipeline.
//!
//! All fallible operations across the workspace return `ToolkitResult<T>`.
//! Variants carry enough context to produce an actionable `agent-error`
//! lifecycle event and a structured log line.

use serde_json::Value;
use thiserror::Error;

use crate::guardrail::GuardrailPhase;

/// The unified error type for the agentkit runtime.
#[derive(Debug, Clone, Error)]
pub enum ToolkitError {
    /// An input or output guardrail tripped. Always fatal to the turn.
    #[error("{phase} guardrail \"{guardrail}\" triggered: {info}")]
    GuardrailViolation {
        guardrail: String,
        phase: GuardrailPhase,
        /// Diagnostic payload reported by the guardrail (`Value::Null` when absent).
        info: Value,
    },

    /// A tool gated by an approval predicate was invoked and approval evaluated true.
    ///
    /// There is no pause/resume protocol, so the turn aborts.
    #[error("tool \"{tool}\" requires approval; approval flow is not available")]
    ApprovalRequired { tool: String },

    /// The reasoning-engine collaborator failed (network, provider, malformed response).
    #[error("reasoning engine failure: {reason}")]
    ReasoningEngine { reason: String },

    /// A dynamic instructions or tool-set resolver failed.
    #[error("resolution failure: {reason}")]
    Resolution { reason: String },

    /// Tool arguments did not satisfy the tool's parameter schema.
    #[error("invalid arguments for tool \"{tool}\": {reason}")]
    InvalidToolArguments { tool: String, reason: String },

    /// The model requested a tool that is not in the resolved tool set.
    #[error("tool \"{tool}\" is not available in this turn")]
    ToolNotFound { tool: String },

    /// A tool's execute function returned an error.
    #[error("tool \"{tool}\" failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// A handoff instruction named an agent that is not a configured target.
    #[error("handoff target \"{target}\" is not a configured downstream agent")]
    HandoffTargetUnknown { target: String },

    /// Chained handoffs exceeded the configured nesting limit.
    #[error("handoff chain exceeded the maximum depth of {limit}")]
    HandoffDepthExceeded { limit: u32 },

    /// The generated text did not satisfy the agent's declared output schema.
    #[error("output validation failed: {reason}")]
    OutputValidation { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// A cache or memory store could not complete an operation.
    #[error("storage error: {reason}")]
    Storage { reason: String },
}

impl ToolkitError {
    /// Stable kebab-case discriminant, used in lifecycle events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GuardrailViolation { .. } => "guardrail-violation",
            Self::ApprovalRequired { .. } => "approval-required",
            Self::ReasoningEngine { .. } => "reasoning-engine",
            Self::Resolution { .. } => "resolution",
            Self::InvalidToolArguments { .. } => "invalid-tool-arguments",
            Self::ToolNotFound { .. } => "tool-not-found",
            Self::ToolFailed { .. } => "tool-failed",
            Self::HandoffTargetUnknown { .. } => "handoff-target-unknown",
            Self::HandoffDepthExceeded { .. } => "handoff-depth-exceeded",
            Self::OutputValidation { .. } => "output-validation",
            Self::Config { .. } => "config",
            Self::Storage { .. } => "storage",
        }
    }

    /// Shorthand for a guardrail trip, used by guardrail pipelines and tests.
    pub fn guardrail(guardrail: impl Into<String>, phase: GuardrailPhase, info: Value) -> Self {
        Self::GuardrailViolation {
            guardrail: guardrail.into(),
            phase,
            info,
        }
    }

    /// Shorthand for a tool execution failure.
    pub fn tool_failed(tool: impl Into<String>, reason: impl ToString) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias used throughout the agentkit crates.
pub type ToolkitResult<T> = Result<T, ToolkitError>;
