//! The control-transfer marker produced by the handoff tool.
//!
//! Invoking the handoff tool does not move control anywhere. It returns a
//! `HandoffInstruction` as its tool result, and the orchestrating agent
//! recognizes that shape when it scans the exchange afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured request to transfer the conversation to another agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffInstruction {
    /// Exact name of the target agent.
    pub target_agent: String,
    /// Summary or context the target should receive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Why control is being transferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HandoffInstruction {
    pub fn new(target_agent: impl Into<String>) -> Self {
        Self {
            target_agent: target_agent.into(),
            context: None,
            reason: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Recognize a tool result as a handoff instruction.
    ///
    /// Any JSON object carrying a string-valued `targetAgent` matches. Optional
    /// `context`/`reason` are taken when they are strings and ignored otherwise.
    pub fn recognize(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let target = object.get("targetAgent")?.as_str()?;
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            target_agent: target.to_string(),
            context: text("context"),
            reason: text("reason"),
        })
    }

    /// Serialize to the JSON shape returned as a tool result.
    pub fn to_value(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("targetAgent".into(), Value::String(self.target_agent.clone()));
        if let Some(context) = &self.context {
            object.insert("context".into(), Value::String(context.clone()));
        }
        if let Some(reason) = &self.reason {
            object.insert("reason".into(), Value::String(reason.clone()));
        }
        Value::Object(object)
    }
}
