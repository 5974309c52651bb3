//! Guardrail outcome types.
//!
//! A guardrail inspects a piece of text at one of two points in a turn and
//! reports whether its tripwire fired. The pipeline that sequences guardrails
//! lives in agentkit-core; these are the values it exchanges with them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where in the turn a guardrail runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardrailPhase {
    /// Against the raw prompt, before any model call.
    Input,
    /// Against the generated text, after the reasoning exchange.
    Output,
}

impl fmt::Display for GuardrailPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// The result of a single guardrail check.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuardrailOutcome {
    /// True when the tripwire fired and the turn must abort.
    pub tripped: bool,
    /// Optional diagnostic payload, carried into the violation error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

impl GuardrailOutcome {
    /// A passing outcome.
    pub fn pass() -> Self {
        Self::default()
    }

    /// A tripped outcome carrying `info`.
    pub fn trip(info: Value) -> Self {
        Self {
            tripped: true,
            info: Some(info),
        }
    }
}
