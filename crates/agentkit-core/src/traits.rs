//! Trait definitions at the trust seams of a turn.
//!
//! - `ReasoningEngine`: the external model-call collaborator that runs the
//!   bounded tool-calling exchange
//! - `ChatModel`      : a single model call, driven by `ToolLoopEngine`
//! - `Guardrail`      : a named pass/fail check on input or output text
//! - `EventSink`      : the observational lifecycle callback
//!
//! The `Agent` wires them together in turn order. None of these are retried
//! by the core; retry policy belongs to the caller or the implementation.

use std::sync::Arc;

use async_trait::async_trait;

use agentkit_contracts::{
    error::ToolkitResult,
    event::AgentEvent,
    guardrail::GuardrailOutcome,
};

use crate::{
    engine::{ChatRequest, ChatResponse, EngineRequest, EngineResponse},
    guardrail::GuardrailInput,
};

/// The reasoning-engine client: runs one complete exchange for a turn.
///
/// Implementations receive the assembled message list, the resolved tool set,
/// model settings, and a round ceiling. They may invoke tools any number of
/// times within at most `max_rounds` model calls, and report every round as
/// a `Step` so the caller can inspect tool results afterwards.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Run the exchange. Failures surface as `ToolkitError::ReasoningEngine`
    /// or as the unchanged error of the tool that aborted the exchange.
    async fn generate(&self, request: EngineRequest) -> ToolkitResult<EngineResponse>;
}

/// One call to a language model, returning text and/or tool-call requests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> ToolkitResult<ChatResponse>;
}

#[async_trait]
impl<M: ChatModel + ?Sized> ChatModel for Arc<M> {
    async fn complete(&self, request: ChatRequest) -> ToolkitResult<ChatResponse> {
        (**self).complete(request).await
    }
}

/// A named check run against input or output text.
///
/// Guardrails may hold internal state (a rate limiter does), but the pipeline
/// treats each call as an independent check. Returning `Err` is reserved for
/// the guardrail itself failing; a policy violation is a tripped outcome.
#[async_trait]
pub trait Guardrail: Send + Sync {
    /// Stable name, reported in `GuardrailViolation`.
    fn name(&self) -> &str;

    async fn check(&self, input: &GuardrailInput<'_>) -> ToolkitResult<GuardrailOutcome>;
}

/// The lifecycle event callback.
///
/// The agent awaits `emit` but ignores its result: a failing sink is logged
/// and never changes the outcome of the turn.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: &AgentEvent) -> ToolkitResult<()>;
}
