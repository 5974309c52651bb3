//! The handoff mechanism: the synthesized transfer tool and configured
//! handoff targets.
//!
//! When an agent declares downstream agents, `handoff_tool` is injected into
//! its resolved tool set. The tool's schema restricts `targetAgent` to the
//! configured names, so a call naming anyone else fails argument validation
//! before it executes. Executing the tool only returns a
//! `HandoffInstruction`; the agent acts on it after the exchange.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::json;

use agentkit_contracts::{
    agent::RunContext,
    error::{ToolkitError, ToolkitResult},
    handoff::HandoffInstruction,
    message::{Message, ToolResult},
};

use crate::{agent::Agent, tool::Tool};

/// Reserved name of the synthesized transfer tool.
pub const HANDOFF_TOOL_NAME: &str = "handoff_to_agent";

/// Build the transfer tool for the given target names.
pub fn handoff_tool(targets: &[String]) -> Tool {
    let description = format!(
        "Transfer the conversation to another specialized agent.\n\n\
         Available agents: {}\n\n\
         Use this when the user's request is better handled by one of these agents.",
        targets.join(", ")
    );

    let parameters = json!({
        "type": "object",
        "properties": {
            "targetAgent": {
                "type": "string",
                "enum": targets,
                "description": "Name of the agent to transfer to"
            },
            "context": {
                "type": "string",
                "description": "Summary of the conversation so far for the receiving agent"
            },
            "reason": {
                "type": "string",
                "description": "Why the conversation is being transferred"
            }
        },
        "required": ["targetAgent"],
        "additionalProperties": false
    });

    Tool::new(HANDOFF_TOOL_NAME, description, parameters, |input, _ctx, _meta| async move {
        let instruction = HandoffInstruction::recognize(&input).ok_or_else(|| {
            ToolkitError::InvalidToolArguments {
                tool: HANDOFF_TOOL_NAME.to_string(),
                reason: "missing string field \"targetAgent\"".to_string(),
            }
        })?;
        Ok(instruction.to_value())
    })
}

/// Build a handoff instruction value directly, as a tool would return it.
pub fn create_handoff(
    target_agent: impl Into<String>,
    context: Option<String>,
    reason: Option<String>,
) -> HandoffInstruction {
    HandoffInstruction {
        target_agent: target_agent.into(),
        context,
        reason,
    }
}

/// Whether a tool result was produced by the transfer tool.
pub fn is_handoff_tool(tool_name: &str) -> bool {
    tool_name == HANDOFF_TOOL_NAME
}

/// The JSON string an agent's answer is attributed with after a transfer.
pub fn transfer_message(agent_name: &str) -> String {
    json!({ "assistant": agent_name }).to_string()
}

/// Every handoff instruction in `results`, in order.
///
/// Any result with the instruction shape counts, whichever tool produced it.
pub fn scan_handoffs<'a>(
    results: impl IntoIterator<Item = &'a ToolResult>,
) -> Vec<HandoffInstruction> {
    results
        .into_iter()
        .filter_map(|r| HandoffInstruction::recognize(&r.result))
        .collect()
}

/// What the target agent is given when control transfers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandoffInputData {
    /// History the delegating agent received from its caller.
    pub input_history: Vec<Message>,
    /// Messages the delegating agent produced before the transfer call.
    pub pre_handoff_items: Vec<Message>,
    /// Messages produced by the transfer itself.
    pub new_items: Vec<Message>,
}

type OnHandoffFn = dyn Fn(RunContext) -> BoxFuture<'static, ToolkitResult<()>> + Send + Sync;
type InputFilterFn = dyn Fn(HandoffInputData) -> HandoffInputData + Send + Sync;

/// A configured downstream agent with optional transfer hooks.
#[derive(Clone)]
pub struct Handoff {
    agent: Arc<Agent>,
    on_handoff: Option<Arc<OnHandoffFn>>,
    input_filter: Option<Arc<InputFilterFn>>,
}

impl Handoff {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self {
            agent,
            on_handoff: None,
            input_filter: None,
        }
    }

    /// Run `hook` just before the target agent starts.
    pub fn on_handoff<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolkitResult<()>> + Send + 'static,
    {
        self.on_handoff = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        self
    }

    /// Transform what the target agent sees.
    pub fn input_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(HandoffInputData) -> HandoffInputData + Send + Sync + 'static,
    {
        self.input_filter = Some(Arc::new(filter));
        self
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub fn target_name(&self) -> &str {
        self.agent.name()
    }

    pub(crate) async fn run_on_handoff(&self, ctx: &RunContext) -> ToolkitResult<()> {
        match &self.on_handoff {
            Some(hook) => hook(ctx.clone()).await,
            None => Ok(()),
        }
    }

    pub(crate) fn filter_input(&self, data: HandoffInputData) -> HandoffInputData {
        match &self.input_filter {
            Some(filter) => filter(data),
            None => data,
        }
    }
}

impl From<Arc<Agent>> for Handoff {
    fn from(agent: Arc<Agent>) -> Self {
        Self::new(agent)
    }
}

impl From<Agent> for Handoff {
    fn from(agent: Agent) -> Self {
        Self::new(Arc::new(agent))
    }
}

impl fmt::Debug for Handoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handoff")
            .field("agent", &self.agent.name())
            .field("on_handoff", &self.on_handoff.is_some())
            .field("input_filter", &self.input_filter.is_some())
            .finish()
    }
}

/// Keep only user and assistant text, dropping tool traffic.
pub fn remove_tool_messages(mut data: HandoffInputData) -> HandoffInputData {
    let keep = |m: &Message| m.tool_calls.is_empty() && m.tool_call_id.is_none();
    data.input_history.retain(keep);
    data.pre_handoff_items.retain(keep);
    data.new_items.retain(keep);
    data
}

// ── Tests ────────────────────────────────────────────────────────────────────
