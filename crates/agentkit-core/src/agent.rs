//! The `Agent`: configuration plus the turn state machine behind `generate`.
//!
//! One turn runs in a fixed order:
//!
//!   input guardrails → agent-start → resolve instructions & tools
//!     → reasoning exchange → handoff scan [→ delegate] → output guardrails
//!     → output schema → agent-end
//!
//! A failure at any point emits `agent-error` and returns the error; no
//! partial result is produced. An input guardrail trip therefore emits no
//! `agent-start`, and an output guardrail trip emits no `agent-end`.
//!
//! An `Agent` is immutable once built. Concurrent `generate` calls on the same
//! agent share nothing but configuration.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, warn};

use agentkit_contracts::{
    agent::{RunContext, TurnId},
    error::{ToolkitError, ToolkitResult},
    event::AgentEvent,
    execution::{GenerateResult, TurnMetadata},
    guardrail::GuardrailPhase,
    handoff::HandoffInstruction,
    message::Message,
};

use crate::{
    config::AgentSettings,
    engine::{EngineRequest, EngineResponse, ModelSettings},
    events::emit_best_effort,
    guardrail::run_guardrails,
    handoff::{handoff_tool, transfer_message, Handoff, HandoffInputData, HANDOFF_TOOL_NAME},
    routing::MatchOn,
    tool::{Tool, ToolSet},
    traits::{EventSink, Guardrail, ReasoningEngine},
};

type InstructionsFn = dyn Fn(RunContext) -> BoxFuture<'static, ToolkitResult<String>> + Send + Sync;
type ToolsFn = dyn Fn(RunContext) -> BoxFuture<'static, ToolkitResult<ToolSet>> + Send + Sync;

/// The system instructions: fixed text or a per-turn resolver.
#[derive(Clone)]
pub enum Instructions {
    Static(String),
    Resolver(Arc<InstructionsFn>),
}

impl Instructions {
    /// Instructions computed from the run context on every turn.
    pub fn dynamic<F, Fut>(resolver: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolkitResult<String>> + Send + 'static,
    {
        Self::Resolver(Arc::new(move |ctx| Box::pin(resolver(ctx))))
    }

    pub async fn resolve(&self, ctx: &RunContext) -> ToolkitResult<String> {
        match self {
            Self::Static(text) => Ok(text.clone()),
            Self::Resolver(resolver) => resolver(ctx.clone()).await.map_err(resolution_failure),
        }
    }
}

impl Default for Instructions {
    fn default() -> Self {
        Self::Static(String::new())
    }
}

impl From<&str> for Instructions {
    fn from(text: &str) -> Self {
        Self::Static(text.to_string())
    }
}

impl From<String> for Instructions {
    fn from(text: String) -> Self {
        Self::Static(text)
    }
}

impl fmt::Debug for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// The tool set: fixed or a per-turn resolver.
#[derive(Clone)]
pub enum Tools {
    Static(ToolSet),
    Resolver(Arc<ToolsFn>),
}

impl Tools {
    /// A tool set computed from the run context on every turn.
    pub fn dynamic<F, Fut>(resolver: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolkitResult<ToolSet>> + Send + 'static,
    {
        Self::Resolver(Arc::new(move |ctx| Box::pin(resolver(ctx))))
    }

    pub async fn resolve(&self, ctx: &RunContext) -> ToolkitResult<ToolSet> {
        match self {
            Self::Static(set) => Ok(set.clone()),
            Self::Resolver(resolver) => resolver(ctx.clone()).await.map_err(resolution_failure),
        }
    }
}

impl Default for Tools {
    fn default() -> Self {
        Self::Static(ToolSet::new())
    }
}

impl From<ToolSet> for Tools {
    fn from(set: ToolSet) -> Self {
        Self::Static(set)
    }
}

impl fmt::Debug for Tools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(set) => f.debug_tuple("Static").field(set).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

fn resolution_failure(error: ToolkitError) -> ToolkitError {
    match error {
        ToolkitError::Resolution { .. } => error,
        other => ToolkitError::Resolution {
            reason: other.to_string(),
        },
    }
}

/// Input to one turn.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub prompt: String,
    /// Prior conversation, oldest first.
    pub messages: Vec<Message>,
    pub context: RunContext,
}

impl GenerateOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = context;
        self
    }
}

impl From<&str> for GenerateOptions {
    fn from(prompt: &str) -> Self {
        Self::new(prompt)
    }
}

impl From<String> for GenerateOptions {
    fn from(prompt: String) -> Self {
        Self::new(prompt)
    }
}

struct OutputSchema {
    schema: Value,
    validator: jsonschema::Validator,
}

/// A configured reasoning unit.
pub struct Agent {
    name: String,
    instructions: Instructions,
    engine: Arc<dyn ReasoningEngine>,
    tools: Tools,
    handoffs: Vec<Handoff>,
    handoff_description: Option<String>,
    input_guardrails: Vec<Arc<dyn Guardrail>>,
    output_guardrails: Vec<Arc<dyn Guardrail>>,
    settings: AgentSettings,
    model_settings: ModelSettings,
    match_on: Option<MatchOn>,
    events: Option<Arc<dyn EventSink>>,
    output_schema: Option<OutputSchema>,
}

impl Agent {
    pub fn builder(name: impl Into<String>, engine: Arc<dyn ReasoningEngine>) -> AgentBuilder {
        AgentBuilder::new(name, engine)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }

    /// When to hand off to this agent, as shown to orchestrators.
    pub fn handoff_description(&self) -> Option<&str> {
        self.handoff_description.as_deref()
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn output_schema(&self) -> Option<&Value> {
        self.output_schema.as_ref().map(|s| &s.schema)
    }

    /// Whether this agent's routing predicate claims `message`.
    ///
    /// Agents without a predicate never match.
    pub fn matches(&self, message: &str) -> bool {
        self.match_on
            .as_ref()
            .is_some_and(|on| on.is_match(message))
    }

    /// Run one full turn.
    pub async fn generate(
        &self,
        options: impl Into<GenerateOptions>,
    ) -> ToolkitResult<GenerateResult> {
        self.run_turn(options.into(), 0).await
    }

    fn run_turn(
        &self,
        options: GenerateOptions,
        depth: u32,
    ) -> BoxFuture<'_, ToolkitResult<GenerateResult>> {
        Box::pin(async move {
            let turn_id = TurnId::new();
            match self.execute_turn(&options, depth, turn_id).await {
                Ok(result) => Ok(result),
                Err(error) => {
                    warn!(
                        turn_id = %turn_id,
                        agent = %self.name,
                        kind = error.kind(),
                        error = %error,
                        "turn failed"
                    );
                    self.emit(AgentEvent::error(&self.name, &error)).await;
                    Err(error)
                }
            }
        })
    }

    async fn execute_turn(
        &self,
        options: &GenerateOptions,
        depth: u32,
        turn_id: TurnId,
    ) -> ToolkitResult<GenerateResult> {
        let start_time = Utc::now();
        let ctx = &options.context;

        debug!(turn_id = %turn_id, agent = %self.name, depth, "turn starting");

        // ── Input guardrails ─────────────────────────────────────────────────
        run_guardrails(&self.input_guardrails, GuardrailPhase::Input, &options.prompt, ctx).await?;

        self.emit(AgentEvent::AgentStart {
            agent: self.name.clone(),
            round: 0,
        })
        .await;

        // ── Resolution ───────────────────────────────────────────────────────
        let system = self.instructions.resolve(ctx).await?;
        let tools = self.resolve_tools(ctx).await?;

        debug!(
            turn_id = %turn_id,
            agent = %self.name,
            tools = tools.len(),
            "instructions and tools resolved"
        );

        // ── Reasoning exchange ───────────────────────────────────────────────
        let response = self
            .engine
            .generate(EngineRequest {
                messages: self.build_messages(system, &options.messages, &options.prompt),
                tools,
                settings: self.model_settings.clone(),
                max_rounds: self.settings.max_turns,
                context: ctx.clone(),
            })
            .await?;

        debug!(
            turn_id = %turn_id,
            agent = %self.name,
            rounds = response.steps.len(),
            finish_reason = ?response.finish_reason,
            "reasoning exchange complete"
        );

        // ── Handoff scan ─────────────────────────────────────────────────────
        let selected = if self.handoffs.is_empty() {
            None
        } else {
            self.select_handoff(turn_id, &response)?
        };

        let (text, finish_reason, usage, agent, handoffs) = match selected {
            Some(instruction) => {
                let delegated = self.delegate(&instruction, options, &response, depth).await?;
                let mut chain = vec![instruction.target_agent.clone()];
                chain.extend(delegated.handoffs);
                (
                    delegated.text,
                    delegated.finish_reason,
                    response.usage + delegated.usage,
                    delegated.agent,
                    chain,
                )
            }
            None => (
                response.text,
                response.finish_reason,
                response.usage,
                self.name.clone(),
                Vec::new(),
            ),
        };

        // ── Output guardrails ────────────────────────────────────────────────
        run_guardrails(&self.output_guardrails, GuardrailPhase::Output, &text, ctx).await?;

        let output = self.parse_output(&text)?;

        self.emit(AgentEvent::AgentEnd {
            agent: self.name.clone(),
            round: 0,
        })
        .await;

        let end_time = Utc::now();
        let duration_ms = (end_time - start_time).num_milliseconds();

        info!(
            turn_id = %turn_id,
            agent = %self.name,
            answered_by = %agent,
            duration_ms,
            total_tokens = usage.total_tokens,
            "turn complete"
        );

        Ok(GenerateResult {
            output,
            text,
            finish_reason,
            usage,
            metadata: TurnMetadata {
                turn_id,
                start_time,
                end_time,
                duration_ms,
            },
            agent,
            handoffs,
        })
    }

    async fn resolve_tools(&self, ctx: &RunContext) -> ToolkitResult<ToolSet> {
        let mut tools = self.tools.resolve(ctx).await?;
        tools.retain(|tool| tool.is_enabled(ctx));

        if !self.handoffs.is_empty() {
            if tools.contains(HANDOFF_TOOL_NAME) {
                return Err(ToolkitError::Resolution {
                    reason: format!("tool name \"{HANDOFF_TOOL_NAME}\" is reserved for handoffs"),
                });
            }
            tools.insert(handoff_tool(&self.handoff_names()))?;
        }

        Ok(self.instrument(tools))
    }

    /// Wrap every tool so its execution emits `tool-start` and `tool-end`.
    fn instrument(&self, tools: ToolSet) -> ToolSet {
        let Some(sink) = &self.events else {
            return tools;
        };

        tools.map(|tool| {
            let agent = self.name.clone();
            let tool_name = tool.name().to_string();
            let sink = Arc::clone(sink);
            tool.decorate(move |inner, input, ctx, meta| {
                let agent = agent.clone();
                let tool_name = tool_name.clone();
                let sink = Arc::clone(&sink);
                async move {
                    emit_best_effort(
                        Some(&sink),
                        AgentEvent::ToolStart {
                            agent: agent.clone(),
                            tool_name: tool_name.clone(),
                            args: input.clone(),
                        },
                    )
                    .await;
                    let result = inner.call(input, ctx, meta).await?;
                    emit_best_effort(
                        Some(&sink),
                        AgentEvent::ToolEnd {
                            agent,
                            tool_name,
                            result: result.clone(),
                        },
                    )
                    .await;
                    Ok(result)
                }
            })
        })
    }

    fn build_messages(&self, system: String, history: &[Message], prompt: &str) -> Vec<Message> {
        let history = match self.settings.last_messages {
            Some(n) if history.len() > n => &history[history.len() - n..],
            _ => history,
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system));
        messages.extend_from_slice(history);
        messages.push(Message::user(prompt));
        messages
    }

    async fn delegate(
        &self,
        instruction: &HandoffInstruction,
        options: &GenerateOptions,
        response: &EngineResponse,
        depth: u32,
    ) -> ToolkitResult<GenerateResult> {
        let handoff = self
            .handoffs
            .iter()
            .find(|h| h.target_name() == instruction.target_agent)
            .ok_or_else(|| ToolkitError::HandoffTargetUnknown {
                target: instruction.target_agent.clone(),
            })?;

        let next_depth = depth + 1;
        if next_depth > self.settings.max_handoff_depth {
            return Err(ToolkitError::HandoffDepthExceeded {
                limit: self.settings.max_handoff_depth,
            });
        }

        info!(
            from = %self.name,
            to = %instruction.target_agent,
            reason = ?instruction.reason,
            depth = next_depth,
            "handing off"
        );

        self.emit(AgentEvent::AgentHandoff {
            from: self.name.clone(),
            to: instruction.target_agent.clone(),
            reason: instruction.reason.clone(),
        })
        .await;

        handoff.run_on_handoff(&options.context).await?;

        let pre_handoff_items = response
            .steps
            .iter()
            .filter(|step| !step.text.is_empty())
            .map(|step| Message::assistant(step.text.clone()))
            .collect();

        let data = handoff.filter_input(HandoffInputData {
            input_history: options.messages.clone(),
            pre_handoff_items,
            new_items: vec![Message::assistant(transfer_message(&instruction.target_agent))],
        });

        let mut history = data.input_history;
        history.extend(data.pre_handoff_items);
        history.extend(data.new_items);
        if let Some(context) = &instruction.context {
            history.push(Message::system(format!("Context from {}: {}", self.name, context)));
        }

        handoff
            .agent()
            .run_turn(
                GenerateOptions {
                    prompt: options.prompt.clone(),
                    messages: history,
                    context: options.context.clone(),
                },
                next_depth,
            )
            .await
    }

    fn parse_output(&self, text: &str) -> ToolkitResult<Value> {
        let Some(output) = &self.output_schema else {
            return Ok(Value::String(text.to_string()));
        };

        let value: Value =
            serde_json::from_str(text).map_err(|e| ToolkitError::OutputValidation {
                reason: format!("output is not valid JSON: {e}"),
            })?;

        let violations: Vec<String> = output
            .validator
            .iter_errors(&value)
            .map(|error| format!("{} (at '{}')", error, error.instance_path))
            .collect();

        if violations.is_empty() {
            Ok(value)
        } else {
            Err(ToolkitError::OutputValidation {
                reason: violations.join("; "),
            })
        }
    }

    /// The first instruction naming a configured target.
    ///
    /// Instruction-shaped results from other tools that name anything else
    /// are ignored. The handoff tool's own result must name a configured
    /// target.
    fn select_handoff(
        &self,
        turn_id: TurnId,
        response: &EngineResponse,
    ) -> ToolkitResult<Option<HandoffInstruction>> {
        let mut selected = None;
        let mut ignored = 0usize;

        for result in response.tool_results() {
            let Some(instruction) = HandoffInstruction::recognize(&result.result) else {
                continue;
            };
            let configured = self
                .handoffs
                .iter()
                .any(|h| h.target_name() == instruction.target_agent);

            if !configured && result.tool_name == HANDOFF_TOOL_NAME {
                return Err(ToolkitError::HandoffTargetUnknown {
                    target: instruction.target_agent,
                });
            }
            if configured && selected.is_none() {
                selected = Some(instruction);
            } else {
                ignored += 1;
            }
        }

        if ignored > 0 {
            debug!(
                turn_id = %turn_id,
                ignored,
                "handoff instructions not acted on"
            );
        }
        Ok(selected)
    }

    fn handoff_names(&self) -> Vec<String> {
        self.handoffs
            .iter()
            .map(|h| h.target_name().to_string())
            .collect()
    }

    async fn emit(&self, event: AgentEvent) {
        emit_best_effort(self.events.as_ref(), event).await;
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("instructions", &self.instructions)
            .field("tools", &self.tools)
            .field("handoffs", &self.handoff_names())
            .field("input_guardrails", &self.input_guardrails.len())
            .field("output_guardrails", &self.output_guardrails.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builder for `Agent`. Validation happens in `build`.
pub struct AgentBuilder {
    name: String,
    engine: Arc<dyn ReasoningEngine>,
    instructions: Instructions,
    tools: Tools,
    extra_tools: Vec<Tool>,
    handoffs: Vec<Handoff>,
    handoff_description: Option<String>,
    input_guardrails: Vec<Arc<dyn Guardrail>>,
    output_guardrails: Vec<Arc<dyn Guardrail>>,
    settings: AgentSettings,
    model_settings: ModelSettings,
    match_on: Option<MatchOn>,
    events: Option<Arc<dyn EventSink>>,
    output_schema: Option<Value>,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>, engine: Arc<dyn ReasoningEngine>) -> Self {
        Self {
            name: name.into(),
            engine,
            instructions: Instructions::default(),
            tools: Tools::default(),
            extra_tools: Vec::new(),
            handoffs: Vec::new(),
            handoff_description: None,
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            settings: AgentSettings::default(),
            model_settings: ModelSettings::default(),
            match_on: None,
            events: None,
            output_schema: None,
        }
    }

    pub fn instructions(mut self, instructions: impl Into<Instructions>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn tools(mut self, tools: impl Into<Tools>) -> Self {
        self.tools = tools.into();
        self
    }

    /// Add one tool to a static tool set.
    pub fn tool(mut self, tool: Tool) -> Self {
        self.extra_tools.push(tool);
        self
    }

    pub fn handoff(mut self, handoff: impl Into<Handoff>) -> Self {
        self.handoffs.push(handoff.into());
        self
    }

    pub fn handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    pub fn input_guardrail(mut self, guardrail: Arc<dyn Guardrail>) -> Self {
        self.input_guardrails.push(guardrail);
        self
    }

    pub fn output_guardrail(mut self, guardrail: Arc<dyn Guardrail>) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    pub fn input_guardrails(mut self, guardrails: impl IntoIterator<Item = Arc<dyn Guardrail>>) -> Self {
        self.input_guardrails.extend(guardrails);
        self
    }

    pub fn output_guardrails(mut self, guardrails: impl IntoIterator<Item = Arc<dyn Guardrail>>) -> Self {
        self.output_guardrails.extend(guardrails);
        self
    }

    pub fn settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.settings.max_turns = max_turns;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.settings.temperature = Some(temperature);
        self
    }

    pub fn last_messages(mut self, n: usize) -> Self {
        self.settings.last_messages = Some(n);
        self
    }

    pub fn model_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.model_settings.extra.insert(key.into(), value);
        self
    }

    pub fn match_on(mut self, match_on: MatchOn) -> Self {
        self.match_on = Some(match_on);
        self
    }

    pub fn on_event(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Require the final text to be JSON satisfying `schema`.
    pub fn output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn build(self) -> ToolkitResult<Agent> {
        if self.name.trim().is_empty() {
            return Err(ToolkitError::Config {
                reason: "agent name must not be empty".to_string(),
            });
        }
        self.settings.validate()?;

        let mut seen = std::collections::BTreeSet::new();
        for handoff in &self.handoffs {
            if !seen.insert(handoff.target_name().to_string()) {
                return Err(ToolkitError::Config {
                    reason: format!(
                        "agent \"{}\" declares handoff target \"{}\" twice",
                        self.name,
                        handoff.target_name()
                    ),
                });
            }
        }

        let tools = match (self.tools, self.extra_tools.is_empty()) {
            (tools, true) => tools,
            (Tools::Static(mut set), false) => {
                for tool in self.extra_tools {
                    set.insert(tool)?;
                }
                Tools::Static(set)
            }
            (Tools::Resolver(_), false) => {
                return Err(ToolkitError::Config {
                    reason: format!(
                        "agent \"{}\" cannot combine a tool resolver with static tools",
                        self.name
                    ),
                });
            }
        };

        if let Tools::Static(set) = &tools {
            if !self.handoffs.is_empty() && set.contains(HANDOFF_TOOL_NAME) {
                return Err(ToolkitError::Config {
                    reason: format!("tool name \"{HANDOFF_TOOL_NAME}\" is reserved for handoffs"),
                });
            }
        }

        let output_schema = match self.output_schema {
            Some(schema) => {
                let validator =
                    jsonschema::validator_for(&schema).map_err(|e| ToolkitError::Config {
                        reason: format!("invalid output schema for agent \"{}\": {e}", self.name),
                    })?;
                Some(OutputSchema { schema, validator })
            }
            None => None,
        };

        let mut model_settings = self.model_settings;
        if model_settings.temperature.is_none() {
            model_settings.temperature = self.settings.temperature;
        }

        debug!(
            agent = %self.name,
            handoffs = self.handoffs.len(),
            input_guardrails = self.input_guardrails.len(),
            output_guardrails = self.output_guardrails.len(),
            "agent built"
        );

        Ok(Agent {
            name: self.name,
            instructions: self.instructions,
            engine: self.engine,
            tools,
            handoffs: self.handoffs,
            handoff_description: self.handoff_description,
            input_guardrails: self.input_guardrails,
            output_guardrails: self.output_guardrails,
            settings: self.settings,
            model_settings,
            match_on: self.match_on,
            events: self.events,
            output_schema,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
