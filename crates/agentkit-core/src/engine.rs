//! The reasoning-engine boundary and the reference tool-calling loop.
//!
//! The agent hands a `ReasoningEngine` one `EngineRequest` per turn and gets
//! back an `EngineResponse` with every round recorded as a `Step`. The core
//! never loops itself; the round ceiling is enforced here.
//!
//!   round n: model.complete → [tool calls?] → invoke all concurrently
//!            → append assistant + tool messages → round n+1
//!
//! `ScriptedModel` replays canned responses and is what every test and
//! reference scenario drives the loop with.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use agentkit_contracts::{
    agent::RunContext,
    error::{ToolkitError, ToolkitResult},
    execution::{FinishReason, Step, Usage},
    message::{Message, Role, ToolCall, ToolDefinition, ToolResult},
};

use crate::{
    tool::{ToolCallMeta, ToolSet},
    traits::{ChatModel, ReasoningEngine},
};

/// Provider-independent settings passed through to the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Anything else the model client understands.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Everything the reasoning engine needs for one exchange.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// System message, then history, then the user prompt.
    pub messages: Vec<Message>,
    pub tools: ToolSet,
    pub settings: ModelSettings,
    /// Hard ceiling on model calls within this exchange.
    pub max_rounds: u32,
    pub context: RunContext,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub steps: Vec<Step>,
}

impl EngineResponse {
    /// Every tool result produced during the exchange, in round order.
    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResult> {
        self.steps.iter().flat_map(|step| step.tool_results.iter())
    }
}

/// One model call's input.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub settings: ModelSettings,
}

impl ChatRequest {
    /// The content of the most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// The system message content, if one was supplied.
    pub fn system_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }
}

/// One model call's output: text, tool calls, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl ChatResponse {
    /// A final text answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        }
    }

    /// A round that requests tool calls.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: String::new(),
            tool_calls: calls,
            finish_reason: FinishReason::ToolCalls,
            usage: Usage::default(),
        }
    }

    /// Convenience for a single tool call with a generated id.
    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        let name = name.into();
        Self::tool_calls(vec![ToolCall {
            id: format!("call_{name}"),
            name,
            arguments,
        }])
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

/// The reference reasoning-engine client: a bounded tool-calling loop over a
/// `ChatModel`.
pub struct ToolLoopEngine<M> {
    model: M,
}

impl<M: ChatModel> ToolLoopEngine<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

#[async_trait]
impl<M: ChatModel> ReasoningEngine for ToolLoopEngine<M> {
    async fn generate(&self, request: EngineRequest) -> ToolkitResult<EngineResponse> {
        let EngineRequest {
            mut messages,
            tools,
            settings,
            max_rounds,
            context,
        } = request;

        let definitions = tools.definitions();
        let mut steps = Vec::new();
        let mut usage = Usage::default();

        for round in 0..max_rounds.max(1) {
            let response = self
                .model
                .complete(ChatRequest {
                    messages: messages.clone(),
                    tools: definitions.clone(),
                    settings: settings.clone(),
                })
                .await?;
            usage += response.usage;

            debug!(
                round,
                tool_calls = response.tool_calls.len(),
                "model round complete"
            );

            if response.tool_calls.is_empty() {
                steps.push(Step {
                    text: response.text.clone(),
                    tool_calls: Vec::new(),
                    tool_results: Vec::new(),
                    finish_reason: response.finish_reason,
                    usage: response.usage,
                });
                return Ok(EngineResponse {
                    text: response.text,
                    finish_reason: response.finish_reason,
                    usage,
                    steps,
                });
            }

            // Tool calls within one round run concurrently; rounds are sequential.
            let invocations = response.tool_calls.iter().map(|call| {
                let tools = &tools;
                let context = &context;
                async move {
                    let tool = tools.get(&call.name).ok_or_else(|| ToolkitError::ToolNotFound {
                        tool: call.name.clone(),
                    })?;
                    let result = tool
                        .invoke(call.arguments.clone(), context, ToolCallMeta::new(call.id.clone()))
                        .await?;
                    Ok::<_, ToolkitError>(ToolResult {
                        call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        args: call.arguments.clone(),
                        result,
                    })
                }
            });
            let results = try_join_all(invocations).await?;

            messages.push(Message::assistant_tool_calls(
                response.text.clone(),
                response.tool_calls.clone(),
            ));
            messages.extend(
                results
                    .iter()
                    .map(|r| Message::tool(r.call_id.clone(), render_tool_result(&r.result))),
            );

            steps.push(Step {
                text: response.text,
                tool_calls: response.tool_calls,
                tool_results: results,
                finish_reason: FinishReason::ToolCalls,
                usage: response.usage,
            });
        }

        warn!(max_rounds, "round ceiling reached with tool calls pending");
        let text = steps.last().map(|s| s.text.clone()).unwrap_or_default();
        Ok(EngineResponse {
            text,
            finish_reason: FinishReason::ToolCalls,
            usage,
            steps,
        })
    }
}

/// Tool results go back to the model as text; strings are passed raw.
fn render_tool_result(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A deterministic `ChatModel` that replays a queue of responses.
///
/// Every request is recorded so tests can inspect what the model was sent.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another response.
    pub fn push(&self, response: ChatResponse) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Number of model calls served so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest) -> ToolkitResult<ChatResponse> {
        self.requests
            .lock()
            .map_err(|_| ToolkitError::ReasoningEngine {
                reason: "scripted model lock poisoned".to_string(),
            })?
            .push(request);

        self.responses
            .lock()
            .map_err(|_| ToolkitError::ReasoningEngine {
                reason: "scripted model lock poisoned".to_string(),
            })?
            .pop_front()
            .ok_or_else(|| ToolkitError::ReasoningEngine {
                reason: "scripted model has no responses left".to_string(),
            })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
