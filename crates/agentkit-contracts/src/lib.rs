//! # agentkit-contracts
//!
//! Shared types, lifecycle events, and error contracts for the agentkit
//! runtime.
//!
//! All crates in the workspace import from here. No orchestration logic lives
//! in this crate, only data definitions and the unified error type.

pub mod agent;
pub mod error;
pub mod event;
pub mod execution;
pub mod guardrail;
pub mod handoff;
pub mod message;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use agent::{RunContext, TurnId};
    use error::ToolkitError;
    use event::AgentEvent;
    use execution::Usage;
    use guardrail::{GuardrailOutcome, GuardrailPhase};
    use handoff::HandoffInstruction;

    // ── HandoffInstruction recognition ───────────────────────────────────────

    #[test]
    fn handoff_recognizes_string_target() {
        let value = json!({ "targetAgent": "Math", "reason": "arithmetic" });
        let instruction = HandoffInstruction::recognize(&value).unwrap();

        assert_eq!(instruction.target_agent, "Math");
        assert_eq!(instruction.reason.as_deref(), Some("arithmetic"));
        assert!(instruction.context.is_none());
    }

    #[test]
    fn handoff_rejects_non_string_target() {
        assert!(HandoffInstruction::recognize(&json!({ "targetAgent": 7 })).is_none());
        assert!(HandoffInstruction::recognize(&json!({ "target": "Math" })).is_none());
        assert!(HandoffInstruction::recognize(&json!("Math")).is_none());
        assert!(HandoffInstruction::recognize(&serde_json::Value::Null).is_none());
    }

    #[test]
    fn handoff_value_shape_is_recognizable() {
        let instruction = HandoffInstruction::new("Weather")
            .with_context("user is in Tokyo")
            .with_reason("weather question");
        let value = instruction.to_value();

        assert_eq!(value["targetAgent"], "Weather");
        assert_eq!(HandoffInstruction::recognize(&value), Some(instruction));
    }

    // ── AgentEvent wire format ───────────────────────────────────────────────

    #[test]
    fn agent_event_uses_kebab_case_type_tag() {
        let event = AgentEvent::AgentStart {
            agent: "A".to_string(),
            round: 0,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "agent-start");
        assert_eq!(json["agent"], "A");
        assert_eq!(json["round"], 0);
        assert_eq!(event.kind(), "agent-start");
    }

    #[test]
    fn tool_event_fields_are_camel_case() {
        let event = AgentEvent::ToolStart {
            agent: "A".to_string(),
            tool_name: "get_weather".to_string(),
            args: json!({ "location": "Tokyo" }),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "tool-start");
        assert_eq!(json["toolName"], "get_weather");
    }

    #[test]
    fn agent_error_event_carries_error_kind() {
        let err = ToolkitError::ApprovalRequired {
            tool: "delete_file".to_string(),
        };
        match AgentEvent::error("A", &err) {
            AgentEvent::AgentError { agent, kind, message } => {
                assert_eq!(agent, "A");
                assert_eq!(kind, "approval-required");
                assert!(message.contains("delete_file"));
            }
            other => panic!("expected AgentError, got {:?}", other),
        }
    }

    // ── ToolkitError display messages ────────────────────────────────────────

    #[test]
    fn error_guardrail_violation_display() {
        let err = ToolkitError::guardrail(
            "length-validator-output",
            GuardrailPhase::Output,
            json!({ "reason": "Output too long" }),
        );
        let msg = err.to_string();
        assert!(msg.contains("output guardrail"));
        assert!(msg.contains("length-validator-output"));
        assert!(msg.contains("Output too long"));
        assert_eq!(err.kind(), "guardrail-violation");
    }

    #[test]
    fn error_reasoning_engine_display() {
        let err = ToolkitError::ReasoningEngine {
            reason: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(err.kind(), "reasoning-engine");
    }

    #[test]
    fn error_invalid_tool_arguments_display() {
        let err = ToolkitError::InvalidToolArguments {
            tool: "handoff_to_agent".to_string(),
            reason: "\"Nope\" is not one of [\"Math\"]".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("handoff_to_agent"));
        assert!(msg.contains("Nope"));
    }

    // ── Usage arithmetic ─────────────────────────────────────────────────────

    #[test]
    fn usage_sums_component_wise() {
        let mut total = Usage::new(10, 5);
        total += Usage::new(3, 2);

        assert_eq!(total.prompt_tokens, 13);
        assert_eq!(total.completion_tokens, 7);
        assert_eq!(total.total_tokens, 20);
    }

    #[test]
    fn usage_saturates_instead_of_overflowing() {
        let near_max = Usage::new(u64::MAX - 1, 5);
        assert_eq!(near_max.total_tokens, u64::MAX);

        let total = near_max + Usage::new(10, 1);
        assert_eq!(total.prompt_tokens, u64::MAX);
        assert_eq!(total.completion_tokens, 6);
        assert_eq!(total.total_tokens, u64::MAX);
    }

    // ── RunContext / TurnId ──────────────────────────────────────────────────

    #[test]
    fn run_context_builders_and_extensions() {
        let ctx = RunContext::new()
            .with_chat_id("chat-123")
            .with_user_id("u-1")
            .with_extension("locale", json!("ja-JP"));

        assert_eq!(ctx.chat_id.as_deref(), Some("chat-123"));
        assert_eq!(ctx.user_id.as_deref(), Some("u-1"));
        assert_eq!(ctx.extension("locale"), Some(&json!("ja-JP")));
        assert!(ctx.extension("missing").is_none());
    }

    #[test]
    fn turn_id_new_produces_unique_values() {
        let ids: std::collections::HashSet<String> =
            (0..100).map(|_| TurnId::new().to_string()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn guardrail_outcome_constructors() {
        assert!(!GuardrailOutcome::pass().tripped);
        let tripped = GuardrailOutcome::trip(json!({ "reason": "x" }));
        assert!(tripped.tripped);
        assert_eq!(tripped.info, Some(json!({ "reason": "x" })));
    }
}
