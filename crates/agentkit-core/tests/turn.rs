//! End-to-end turn behaviour: lifecycle ordering, guardrail trips, tool
//! rounds, and handoff delegation, driven by scripted models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use agentkit_contracts::{
    agent::RunContext,
    error::ToolkitError,
    event::AgentEvent,
    execution::{FinishReason, Usage},
    guardrail::GuardrailPhase,
    message::Role,
};
use agentkit_core::{
    engine::{ChatResponse, ScriptedModel},
    events::{FnSink, RecordingSink},
    guardrail::FnGuardrail,
    handoff::{remove_tool_messages, HANDOFF_TOOL_NAME},
    tool::Approval,
    traits::{EventSink, Guardrail, ReasoningEngine},
    Agent, GenerateOptions, Handoff, Tool, ToolLoopEngine,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn engine_for(model: &Arc<ScriptedModel>) -> Arc<dyn ReasoningEngine> {
    Arc::new(ToolLoopEngine::new(Arc::clone(model)))
}

fn model(responses: Vec<ChatResponse>) -> Arc<ScriptedModel> {
    Arc::new(ScriptedModel::new(responses))
}

fn weather_tool(calls: Arc<AtomicUsize>) -> Tool {
    Tool::new(
        "get_weather",
        "Get the current weather for a location",
        json!({
            "type": "object",
            "properties": { "location": { "type": "string" } },
            "required": ["location"]
        }),
        move |_input, _ctx, _meta| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!("sunny"))
            }
        },
    )
}

fn max_length(limit: usize) -> Arc<dyn Guardrail> {
    Arc::new(FnGuardrail::sync("length-validator-output", move |text, _ctx| {
        let length = text.chars().count();
        (length > limit).then(|| {
            json!({ "reason": "Output too long", "length": length, "maximum": limit })
        })
    }))
}

fn always_trip(name: &str) -> Arc<dyn Guardrail> {
    Arc::new(FnGuardrail::sync(name, |_text, _ctx| Some(json!({ "reason": "blocked" }))))
}

// ── Lifecycle ordering ───────────────────────────────────────────────────────

#[tokio::test]
async fn zero_config_agent_returns_engine_text_verbatim() {
    let model = model(vec![ChatResponse::text("  Hello, world!\n").with_usage(Usage::new(7, 4))]);
    let sink = RecordingSink::new();
    let agent = Agent::builder("A", engine_for(&model))
        .on_event(Arc::new(sink.clone()))
        .build()
        .unwrap();

    let result = agent.generate("hi").await.unwrap();

    assert_eq!(result.text, "  Hello, world!\n");
    assert_eq!(result.finish_reason, FinishReason::Stop);
    assert_eq!(result.usage.total_tokens, 11);
    assert_eq!(sink.kinds(), vec!["agent-start", "agent-end"]);
    assert_eq!(
        sink.events()[0],
        AgentEvent::AgentStart {
            agent: "A".to_string(),
            round: 0
        }
    );
}

#[tokio::test]
async fn input_guardrail_trip_emits_only_agent_error() {
    let model = model(vec![ChatResponse::text("never")]);
    let sink = RecordingSink::new();
    let agent = Agent::builder("A", engine_for(&model))
        .input_guardrail(always_trip("content-filter-input"))
        .on_event(Arc::new(sink.clone()))
        .build()
        .unwrap();

    let err = agent.generate("bad words").await.unwrap_err();

    match err {
        ToolkitError::GuardrailViolation { guardrail, phase, .. } => {
            assert_eq!(guardrail, "content-filter-input");
            assert_eq!(phase, GuardrailPhase::Input);
        }
        other => panic!("expected GuardrailViolation, got {:?}", other),
    }
    assert_eq!(sink.kinds(), vec!["agent-error"]);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn output_guardrail_trip_emits_start_but_not_end() {
    let model = model(vec![ChatResponse::text("This answer is far too long.")]);
    let sink = RecordingSink::new();
    let agent = Agent::builder("A", engine_for(&model))
        .output_guardrail(max_length(5))
        .on_event(Arc::new(sink.clone()))
        .build()
        .unwrap();

    let err = agent.generate("tell me something").await.unwrap_err();

    match err {
        ToolkitError::GuardrailViolation { guardrail, phase, info } => {
            assert_eq!(guardrail, "length-validator-output");
            assert_eq!(phase, GuardrailPhase::Output);
            assert_eq!(info["reason"], "Output too long");
            assert_eq!(info["maximum"], 5);
        }
        other => panic!("expected GuardrailViolation, got {:?}", other),
    }
    assert_eq!(sink.kinds(), vec!["agent-start", "agent-error"]);

    match &sink.events()[1] {
        AgentEvent::AgentError { agent, kind, .. } => {
            assert_eq!(agent, "A");
            assert_eq!(kind, "guardrail-violation");
        }
        other => panic!("expected AgentError, got {:?}", other),
    }
}

#[tokio::test]
async fn reasoning_engine_failure_is_surfaced_after_start() {
    let model = model(vec![]);
    let sink = RecordingSink::new();
    let agent = Agent::builder("A", engine_for(&model))
        .on_event(Arc::new(sink.clone()))
        .build()
        .unwrap();

    let err = agent.generate("hi").await.unwrap_err();

    assert_eq!(err.kind(), "reasoning-engine");
    assert_eq!(sink.kinds(), vec!["agent-start", "agent-error"]);
}

#[tokio::test]
async fn failing_sink_does_not_change_the_outcome() {
    let model = model(vec![ChatResponse::text("fine")]);
    let sink: Arc<dyn EventSink> = Arc::new(FnSink::new(|_event| async {
        Err(ToolkitError::Storage {
            reason: "sink offline".to_string(),
        })
    }));
    let agent = Agent::builder("A", engine_for(&model)).on_event(sink).build().unwrap();

    let result = agent.generate("hi").await.unwrap();
    assert_eq!(result.text, "fine");
}

// ── Tool rounds ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn weather_tool_round_produces_sunny_answer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = model(vec![
        ChatResponse::tool_call("get_weather", json!({ "location": "Tokyo" })),
        ChatResponse::text("The weather in Tokyo is sunny."),
    ]);
    let sink = RecordingSink::new();
    let agent = Agent::builder("A", engine_for(&model))
        .instructions("You are a helpful weather assistant.")
        .tool(weather_tool(Arc::clone(&calls)))
        .max_turns(10)
        .on_event(Arc::new(sink.clone()))
        .build()
        .unwrap();

    let result = agent.generate("weather in Tokyo").await.unwrap();

    assert!(result.text.contains("sunny"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(model.calls(), 2);
    assert_eq!(
        sink.kinds(),
        vec!["agent-start", "tool-start", "tool-end", "agent-end"]
    );
    assert_eq!(
        sink.events()[1],
        AgentEvent::ToolStart {
            agent: "A".to_string(),
            tool_name: "get_weather".to_string(),
            args: json!({ "location": "Tokyo" }),
        }
    );
    assert_eq!(
        sink.events()[2],
        AgentEvent::ToolEnd {
            agent: "A".to_string(),
            tool_name: "get_weather".to_string(),
            result: json!("sunny"),
        }
    );
}

#[tokio::test]
async fn max_turns_caps_model_calls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = model(vec![
        ChatResponse::tool_call("get_weather", json!({ "location": "A" })),
        ChatResponse::tool_call("get_weather", json!({ "location": "B" })),
        ChatResponse::tool_call("get_weather", json!({ "location": "C" })),
    ]);
    let agent = Agent::builder("A", engine_for(&model))
        .tool(weather_tool(Arc::clone(&calls)))
        .max_turns(2)
        .build()
        .unwrap();

    let result = agent.generate("loop forever").await.unwrap();

    assert_eq!(result.finish_reason, FinishReason::ToolCalls);
    assert_eq!(model.calls(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn approval_required_aborts_the_turn() {
    let model = model(vec![
        ChatResponse::tool_call("delete_file", json!({ "path": "/etc/passwd" })),
        ChatResponse::text("deleted"),
    ]);
    let executed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executed);
    let delete = Tool::new(
        "delete_file",
        "Delete a file",
        json!({ "type": "object", "properties": { "path": { "type": "string" } } }),
        move |_input, _ctx, _meta| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            }
        },
    )
    .with_approval(Approval::Always);
    let sink = RecordingSink::new();
    let agent = Agent::builder("A", engine_for(&model))
        .tool(delete)
        .on_event(Arc::new(sink.clone()))
        .build()
        .unwrap();

    let err = agent.generate("delete it").await.unwrap_err();

    assert!(matches!(err, ToolkitError::ApprovalRequired { ref tool } if tool == "delete_file"));
    assert_eq!(executed.load(Ordering::SeqCst), 0);
    // Approval is checked before the instrumented execute step runs.
    assert_eq!(sink.kinds(), vec!["agent-start", "agent-error"]);
}

#[tokio::test]
async fn concurrent_turns_on_one_agent_are_independent() {
    let model = model(vec![ChatResponse::text("one"), ChatResponse::text("two")]);
    let agent = Arc::new(Agent::builder("A", engine_for(&model)).build().unwrap());

    let (a, b) = tokio::join!(agent.generate("first"), agent.generate("second"));

    let mut texts = vec![a.unwrap().text, b.unwrap().text];
    texts.sort();
    assert_eq!(texts, vec!["one", "two"]);
}

// ── Handoffs ─────────────────────────────────────────────────────────────────

struct Team {
    orchestrator: Agent,
    orchestrator_model: Arc<ScriptedModel>,
    math_model: Arc<ScriptedModel>,
    sink: RecordingSink,
}

fn team(orchestrator_script: Vec<ChatResponse>, math_script: Vec<ChatResponse>) -> Team {
    let sink = RecordingSink::new();
    let events: Arc<dyn EventSink> = Arc::new(sink.clone());

    let weather_model = model(vec![]);
    let weather = Agent::builder("Weather", engine_for(&weather_model))
        .handoff_description("Weather questions")
        .on_event(Arc::clone(&events))
        .build()
        .unwrap();

    let math_model = model(math_script);
    let math = Agent::builder("Math", engine_for(&math_model))
        .instructions("You solve arithmetic.")
        .on_event(Arc::clone(&events))
        .build()
        .unwrap();

    let orchestrator_model = model(orchestrator_script);
    let orchestrator = Agent::builder("Orchestrator", engine_for(&orchestrator_model))
        .handoff(weather)
        .handoff(math)
        .on_event(events)
        .build()
        .unwrap();

    Team {
        orchestrator,
        orchestrator_model,
        math_model,
        sink,
    }
}

#[tokio::test]
async fn handoff_to_math_delegates_and_returns_its_text() {
    let team = team(
        vec![
            ChatResponse::tool_call(
                HANDOFF_TOOL_NAME,
                json!({ "targetAgent": "Math", "context": "user wants 2+2", "reason": "arithmetic" }),
            )
            .with_usage(Usage::new(10, 5)),
            ChatResponse::text("Transferring you to Math.").with_usage(Usage::new(12, 3)),
        ],
        vec![ChatResponse::text("2 + 2 = 4").with_usage(Usage::new(8, 2))],
    );

    let result = team.orchestrator.generate("what is 2+2?").await.unwrap();

    assert_eq!(result.text, "2 + 2 = 4");
    assert_eq!(result.agent, "Math");
    assert_eq!(result.handoffs, vec!["Math"]);
    assert_eq!(result.usage.total_tokens, 40);

    assert_eq!(
        team.sink.kinds(),
        vec![
            "agent-start",
            "tool-start",
            "tool-end",
            "agent-handoff",
            "agent-start",
            "agent-end",
            "agent-end",
        ]
    );
    assert!(team.sink.events().contains(&AgentEvent::AgentHandoff {
        from: "Orchestrator".to_string(),
        to: "Math".to_string(),
        reason: Some("arithmetic".to_string()),
    }));

    // Math received the original prompt plus the transferred context.
    let sent = &team.math_model.requests()[0].messages;
    assert_eq!(sent.first().map(|m| m.role), Some(Role::System));
    assert!(sent
        .iter()
        .any(|m| m.role == Role::System && m.content == "Context from Orchestrator: user wants 2+2"));
    assert_eq!(sent.last().map(|m| m.content.as_str()), Some("what is 2+2?"));
}

#[tokio::test]
async fn handoff_tool_lists_only_configured_targets() {
    let team = team(vec![ChatResponse::text("no handoff needed")], vec![]);

    let result = team.orchestrator.generate("hello").await.unwrap();
    assert_eq!(result.agent, "Orchestrator");

    let offered = &team.orchestrator_model.requests()[0].tools;
    let handoff = offered.iter().find(|d| d.name == HANDOFF_TOOL_NAME).unwrap();
    assert_eq!(
        handoff.parameters["properties"]["targetAgent"]["enum"],
        json!(["Weather", "Math"])
    );
}

#[tokio::test]
async fn handoff_to_unconfigured_agent_fails_validation() {
    let team = team(
        vec![ChatResponse::tool_call(HANDOFF_TOOL_NAME, json!({ "targetAgent": "News" }))],
        vec![],
    );

    let err = team.orchestrator.generate("headlines?").await.unwrap_err();

    match err {
        ToolkitError::InvalidToolArguments { tool, .. } => assert_eq!(tool, HANDOFF_TOOL_NAME),
        other => panic!("expected InvalidToolArguments, got {:?}", other),
    }
    assert!(!team.sink.kinds().contains(&"agent-handoff"));
    assert_eq!(team.math_model.calls(), 0);
}

fn ticket_lookup() -> Tool {
    Tool::new("lookup_ticket", "Find a support ticket", Value::Null, |_i, _c, _m| async {
        Ok(json!({ "id": 7, "targetAgent": "Billing" }))
    })
}

#[tokio::test]
async fn agent_without_handoffs_ignores_instruction_shaped_results() {
    let model = model(vec![
        ChatResponse::tool_call("lookup_ticket", json!({})),
        ChatResponse::text("Ticket is assigned to Billing."),
    ]);
    let sink = RecordingSink::new();
    let agent = Agent::builder("Support", engine_for(&model))
        .tool(ticket_lookup())
        .on_event(Arc::new(sink.clone()))
        .build()
        .unwrap();

    let result = agent.generate("where is ticket 7?").await.unwrap();

    assert_eq!(result.text, "Ticket is assigned to Billing.");
    assert_eq!(result.agent, "Support");
    assert!(result.handoffs.is_empty());
    assert!(!sink.kinds().contains(&"agent-handoff"));
}

#[tokio::test]
async fn unconfigured_target_from_another_tool_is_ignored() {
    let model = model(vec![
        ChatResponse::tool_call("lookup_ticket", json!({})),
        ChatResponse::text("Billing owns that ticket."),
    ]);
    let math_model = self::model(vec![]);
    let math = Agent::builder("Math", engine_for(&math_model)).build().unwrap();
    let agent = Agent::builder("Orchestrator", engine_for(&model))
        .tool(ticket_lookup())
        .handoff(math)
        .build()
        .unwrap();

    let result = agent.generate("who owns ticket 7?").await.unwrap();

    assert_eq!(result.text, "Billing owns that ticket.");
    assert_eq!(result.agent, "Orchestrator");
    assert_eq!(math_model.calls(), 0);
}

#[tokio::test]
async fn stray_instruction_does_not_block_a_later_handoff() {
    let model = model(vec![
        ChatResponse::tool_call("lookup_ticket", json!({})),
        ChatResponse::tool_call(HANDOFF_TOOL_NAME, json!({ "targetAgent": "Math" })),
        ChatResponse::text("Transferring you to Math."),
    ]);
    let math_model = self::model(vec![ChatResponse::text("The refund is 12.50")]);
    let math = Agent::builder("Math", engine_for(&math_model)).build().unwrap();
    let agent = Agent::builder("Orchestrator", engine_for(&model))
        .tool(ticket_lookup())
        .handoff(math)
        .build()
        .unwrap();

    let result = agent.generate("how much is my refund?").await.unwrap();

    assert_eq!(result.text, "The refund is 12.50");
    assert_eq!(result.agent, "Math");
    assert_eq!(result.handoffs, vec!["Math"]);
}

#[tokio::test]
async fn output_guardrails_of_orchestrator_apply_to_delegated_text() {
    let math_model = model(vec![ChatResponse::text("The answer, after much thought, is 4.")]);
    let math = Agent::builder("Math", engine_for(&math_model)).build().unwrap();
    let model = model(vec![
        ChatResponse::tool_call(HANDOFF_TOOL_NAME, json!({ "targetAgent": "Math" })),
        ChatResponse::text("handing off"),
    ]);
    let agent = Agent::builder("Orchestrator", engine_for(&model))
        .handoff(math)
        .output_guardrail(max_length(10))
        .build()
        .unwrap();

    let err = agent.generate("2+2").await.unwrap_err();

    assert!(matches!(err, ToolkitError::GuardrailViolation { phase: GuardrailPhase::Output, .. }));
}

#[tokio::test]
async fn handoff_hooks_run_and_filter_history() {
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hook_calls);
    let math_model = model(vec![ChatResponse::text("4")]);
    let math = Arc::new(Agent::builder("Math", engine_for(&math_model)).build().unwrap());
    let handoff = Handoff::new(math)
        .on_handoff(move |ctx: RunContext| {
            let counter = Arc::clone(&counter);
            async move {
                assert_eq!(ctx.chat_id.as_deref(), Some("chat-1"));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .input_filter(remove_tool_messages);
    let model = model(vec![
        ChatResponse::tool_call(HANDOFF_TOOL_NAME, json!({ "targetAgent": "Math" })),
        ChatResponse::text("handing off"),
    ]);
    let agent = Agent::builder("Orchestrator", engine_for(&model))
        .handoff(handoff)
        .build()
        .unwrap();

    let history = vec![
        agentkit_contracts::message::Message::user("earlier"),
        agentkit_contracts::message::Message::tool("call_0", "stale tool output"),
    ];
    let result = agent
        .generate(
            GenerateOptions::new("2+2")
                .with_messages(history)
                .with_context(RunContext::new().with_chat_id("chat-1")),
        )
        .await
        .unwrap();

    assert_eq!(result.text, "4");
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    let sent = &math_model.requests()[0].messages;
    assert!(sent.iter().all(|m| m.role != Role::Tool));
    assert!(sent.iter().any(|m| m.content == "earlier"));
    assert!(sent.iter().any(|m| m.content == r#"{"assistant":"Math"}"#));
}

#[tokio::test]
async fn handoff_chain_respects_depth_limit() {
    // A → B → C, with A allowing only one level of delegation.
    let c_model = model(vec![ChatResponse::text("from C")]);
    let c = Agent::builder("C", engine_for(&c_model)).build().unwrap();

    let b_model = model(vec![
        ChatResponse::tool_call(HANDOFF_TOOL_NAME, json!({ "targetAgent": "C" })),
        ChatResponse::text("to C"),
    ]);
    let b = Agent::builder("B", engine_for(&b_model))
        .handoff(c)
        .settings(agentkit_core::AgentSettings {
            max_handoff_depth: 1,
            ..Default::default()
        })
        .build()
        .unwrap();

    let a_model = model(vec![
        ChatResponse::tool_call(HANDOFF_TOOL_NAME, json!({ "targetAgent": "B" })),
        ChatResponse::text("to B"),
    ]);
    let a = Agent::builder("A", engine_for(&a_model))
        .handoff(b)
        .build()
        .unwrap();

    let err = a.generate("go deep").await.unwrap_err();

    assert!(matches!(err, ToolkitError::HandoffDepthExceeded { limit: 1 }));
    assert_eq!(c_model.calls(), 0);
}

#[tokio::test]
async fn handoff_chain_within_limit_reports_full_path() {
    let c_model = model(vec![ChatResponse::text("from C")]);
    let c = Agent::builder("C", engine_for(&c_model)).build().unwrap();

    let b_model = model(vec![
        ChatResponse::tool_call(HANDOFF_TOOL_NAME, json!({ "targetAgent": "C" })),
        ChatResponse::text("to C"),
    ]);
    let b = Agent::builder("B", engine_for(&b_model)).handoff(c).build().unwrap();

    let a_model = model(vec![
        ChatResponse::tool_call(HANDOFF_TOOL_NAME, json!({ "targetAgent": "B" })),
        ChatResponse::text("to B"),
    ]);
    let a = Agent::builder("A", engine_for(&a_model)).handoff(b).build().unwrap();

    let result = a.generate("go deep").await.unwrap();

    assert_eq!(result.text, "from C");
    assert_eq!(result.agent, "C");
    assert_eq!(result.handoffs, vec!["B", "C"]);
}
