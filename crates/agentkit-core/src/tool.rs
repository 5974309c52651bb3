//! The tool adapter.
//!
//! A `Tool` wraps a caller-supplied execute function with a name, a
//! description, and a JSON Schema for its arguments. `Tool::invoke` is the
//! only way the reasoning engine runs a tool, and it always applies the same
//! gate order:
//!
//!   validate arguments → approval gate → execute
//!
//! Decorators (caching, lifecycle instrumentation) wrap only the execute
//! step via `Tool::decorate`, so validation and approval are never bypassed.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use agentkit_contracts::{
    agent::RunContext,
    error::{ToolkitError, ToolkitResult},
    message::ToolDefinition,
};

/// The boxed future every execute function returns.
pub type ToolFuture = BoxFuture<'static, ToolkitResult<Value>>;

type ExecuteFn = dyn Fn(Value, RunContext, ToolCallMeta) -> ToolFuture + Send + Sync;
type ApprovalFn = dyn Fn(&RunContext, &Value) -> bool + Send + Sync;
type EnabledFn = dyn Fn(&RunContext) -> bool + Send + Sync;

/// Metadata about the call being executed, threaded through to the tool.
///
/// The call id lets tools make side effects idempotent or correlate them with
/// downstream systems.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallMeta {
    pub call_id: Option<String>,
}

impl ToolCallMeta {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: Some(call_id.into()),
        }
    }
}

/// Whether invoking a tool must stop for human approval.
#[derive(Clone, Default)]
pub enum Approval {
    #[default]
    Never,
    Always,
    /// Evaluated per call against the context and the validated input.
    When(Arc<ApprovalFn>),
}

impl Approval {
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&RunContext, &Value) -> bool + Send + Sync + 'static,
    {
        Self::When(Arc::new(predicate))
    }
}

/// Whether a tool is offered to the model for a given context.
#[derive(Clone, Default)]
pub enum Enablement {
    #[default]
    Always,
    Never,
    When(Arc<EnabledFn>),
}

impl Enablement {
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&RunContext) -> bool + Send + Sync + 'static,
    {
        Self::When(Arc::new(predicate))
    }
}

/// A cloneable handle on a tool's raw execute function.
///
/// Handed to decorators so they can call through to the wrapped tool.
#[derive(Clone)]
pub struct ToolExecutor(Arc<ExecuteFn>);

impl ToolExecutor {
    pub fn call(&self, input: Value, ctx: RunContext, meta: ToolCallMeta) -> ToolFuture {
        (self.0)(input, ctx, meta)
    }
}

/// An invocable capability exposed to the reasoning engine.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    parameters: Value,
    execute: Arc<ExecuteFn>,
    approval: Approval,
    enabled: Enablement,
}

impl Tool {
    /// Create a tool from an async execute function over raw JSON input.
    ///
    /// `parameters` is a JSON Schema document; `Value::Null` disables
    /// argument validation.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        execute: F,
    ) -> Self
    where
        F: Fn(Value, RunContext, ToolCallMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolkitResult<Value>> + Send + 'static,
    {
        let execute: Arc<ExecuteFn> = Arc::new(move |input, ctx, meta| {
            let fut: ToolFuture = Box::pin(execute(input, ctx, meta));
            fut
        });
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            execute,
            approval: Approval::Never,
            enabled: Enablement::Always,
        }
    }

    /// Create a tool whose input deserializes into `Args` and whose output
    /// serializes from `Out`.
    pub fn typed<Args, Out, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        execute: F,
    ) -> Self
    where
        Args: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
        F: Fn(Args, RunContext, ToolCallMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolkitResult<Out>> + Send + 'static,
    {
        let name = name.into();
        let tool_name = name.clone();
        let execute = Arc::new(execute);
        Self::new(name, description, parameters, move |input, ctx, meta| {
            let execute = Arc::clone(&execute);
            let tool = tool_name.clone();
            async move {
                let args: Args = serde_json::from_value(input).map_err(|e| {
                    ToolkitError::InvalidToolArguments {
                        tool: tool.clone(),
                        reason: format!("failed to parse arguments: {e}"),
                    }
                })?;
                let output = execute(args, ctx, meta).await?;
                serde_json::to_value(output).map_err(|e| {
                    ToolkitError::tool_failed(tool, format!("failed to serialize result: {e}"))
                })
            }
        })
    }

    pub fn with_approval(mut self, approval: Approval) -> Self {
        self.approval = approval;
        self
    }

    pub fn with_enabled(mut self, enabled: Enablement) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// The model-facing description of this tool.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// Whether the tool should be offered for `ctx`.
    pub fn is_enabled(&self, ctx: &RunContext) -> bool {
        match &self.enabled {
            Enablement::Always => true,
            Enablement::Never => false,
            Enablement::When(predicate) => predicate(ctx),
        }
    }

    /// Whether invoking the tool with `input` requires approval.
    pub fn requires_approval(&self, ctx: &RunContext, input: &Value) -> bool {
        match &self.approval {
            Approval::Never => false,
            Approval::Always => true,
            Approval::When(predicate) => predicate(ctx, input),
        }
    }

    /// Validate, gate, and execute one call.
    pub async fn invoke(
        &self,
        input: Value,
        ctx: &RunContext,
        meta: ToolCallMeta,
    ) -> ToolkitResult<Value> {
        validate_arguments(&self.name, &self.parameters, &input)?;

        if self.requires_approval(ctx, &input) {
            warn!(tool = %self.name, call_id = ?meta.call_id, "tool requires approval, aborting call");
            return Err(ToolkitError::ApprovalRequired {
                tool: self.name.clone(),
            });
        }

        debug!(tool = %self.name, call_id = ?meta.call_id, "executing tool");
        (self.execute)(input, ctx.clone(), meta).await
    }

    /// Return a new tool with the same name, schema, and gating whose execute
    /// step runs through `decorator`.
    ///
    /// The decorator receives a `ToolExecutor` for the wrapped execute
    /// function and decides whether and how to call it.
    pub fn decorate<F, Fut>(&self, decorator: F) -> Tool
    where
        F: Fn(ToolExecutor, Value, RunContext, ToolCallMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolkitResult<Value>> + Send + 'static,
    {
        let inner = ToolExecutor(Arc::clone(&self.execute));
        let execute: Arc<ExecuteFn> = Arc::new(move |input, ctx, meta| {
            let fut: ToolFuture = Box::pin(decorator(inner.clone(), input, ctx, meta));
            fut
        });
        Tool {
            execute,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Check `input` against the JSON Schema `schema`, collecting every violation.
fn validate_arguments(tool: &str, schema: &Value, input: &Value) -> ToolkitResult<()> {
    if schema.is_null() {
        return Ok(());
    }

    let validator = jsonschema::validator_for(schema).map_err(|e| ToolkitError::Config {
        reason: format!("tool \"{tool}\" has an invalid parameter schema: {e}"),
    })?;

    let violations: Vec<String> = validator
        .iter_errors(input)
        .map(|error| format!("{} (at '{}')", error, error.instance_path))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        let reason = violations.join("; ");
        warn!(tool = %tool, %reason, "tool arguments failed schema validation");
        Err(ToolkitError::InvalidToolArguments {
            tool: tool.to_string(),
            reason,
        })
    }
}

/// A name-keyed set of tools, as resolved for one turn.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Tool>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, rejecting duplicate names.
    pub fn from_tools(tools: impl IntoIterator<Item = Tool>) -> ToolkitResult<Self> {
        let mut set = Self::new();
        for tool in tools {
            set.insert(tool)?;
        }
        Ok(set)
    }

    /// Add a tool. Two tools may never share a name within one set.
    pub fn insert(&mut self, tool: Tool) -> ToolkitResult<()> {
        if self.tools.contains_key(tool.name()) {
            return Err(ToolkitError::Config {
                reason: format!("duplicate tool name \"{}\"", tool.name()),
            });
        }
        self.tools.insert(tool.name().to_string(), tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Tool> {
        self.tools.remove(name)
    }

    /// Keep only the tools for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Tool) -> bool) {
        self.tools.retain(|_, tool| keep(tool));
    }

    /// Replace every tool with `f(tool)`; names must be preserved.
    pub fn map(self, mut f: impl FnMut(Tool) -> Tool) -> Self {
        Self {
            tools: self
                .tools
                .into_iter()
                .map(|(name, tool)| (name, f(tool)))
                .collect(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(Tool::definition).collect()
    }
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tools.keys()).finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
