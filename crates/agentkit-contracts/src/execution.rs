//! Turn results and the step records produced by a reasoning exchange.
//!
//! `Step` is what the reasoning engine reports per tool-calling round.
//! `GenerateResult` is what `Agent::generate` returns to the caller after a
//! successful turn; a failed turn produces no result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    agent::TurnId,
    message::{ToolCall, ToolResult},
};

/// Why the reasoning engine stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// The model produced a final answer.
    Stop,
    /// The model hit its token limit.
    Length,
    /// The round ceiling was reached while the model still wanted tools.
    ToolCalls,
    /// The provider filtered the content.
    ContentFilter,
    Other,
}

/// Token accounting for a model call or a whole turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

impl std::ops::Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
        }
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        *self = *self + rhs;
    }
}

/// One model call inside a reasoning exchange, with the tools it ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Text the model produced in this round (often empty when calling tools).
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// Timing metadata for a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub turn_id: TurnId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: i64,
}

/// The outcome of one successful `generate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResult {
    /// The text as a JSON string, or the parsed value when the agent declares
    /// an output schema.
    pub output: Value,
    /// The final generated text, verbatim.
    pub text: String,
    pub finish_reason: FinishReason,
    /// Usage summed over every exchange in the turn, including delegated ones.
    pub usage: Usage,
    pub metadata: TurnMetadata,
    /// Name of the agent whose exchange produced `text`.
    pub agent: String,
    /// Agents control passed through, in order, when the turn was handed off.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handoffs: Vec<String>,
}
