//! The guardrail pipeline.
//!
//! Runs an ordered list of guardrails against one piece of text. The first
//! tripped guardrail ends the pipeline with `GuardrailViolation`; guardrails
//! after it never run for that call. An empty list always passes.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use agentkit_contracts::{
    agent::RunContext,
    error::{ToolkitError, ToolkitResult},
    guardrail::{GuardrailOutcome, GuardrailPhase},
};

use crate::traits::Guardrail;

/// What a guardrail sees.
#[derive(Debug, Clone, Copy)]
pub struct GuardrailInput<'a> {
    /// The raw prompt (input phase) or generated text (output phase).
    pub text: &'a str,
    pub phase: GuardrailPhase,
    pub context: &'a RunContext,
}

/// Run `guardrails` in order against `text`.
pub async fn run_guardrails(
    guardrails: &[Arc<dyn Guardrail>],
    phase: GuardrailPhase,
    text: &str,
    context: &RunContext,
) -> ToolkitResult<()> {
    let input = GuardrailInput {
        text,
        phase,
        context,
    };

    for guardrail in guardrails {
        let outcome = guardrail.check(&input).await?;
        if outcome.tripped {
            warn!(
                guardrail = %guardrail.name(),
                phase = %phase,
                "guardrail tripped"
            );
            return Err(ToolkitError::guardrail(
                guardrail.name(),
                phase,
                outcome.info.unwrap_or(Value::Null),
            ));
        }
        debug!(guardrail = %guardrail.name(), phase = %phase, "guardrail passed");
    }

    Ok(())
}

type CheckFn =
    dyn for<'a> Fn(&'a GuardrailInput<'a>) -> BoxFuture<'a, ToolkitResult<GuardrailOutcome>>
        + Send
        + Sync;

/// A guardrail built from a name and an async closure.
pub struct FnGuardrail {
    name: String,
    check: Box<CheckFn>,
}

impl FnGuardrail {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: for<'a> Fn(&'a GuardrailInput<'a>) -> BoxFuture<'a, ToolkitResult<GuardrailOutcome>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    /// A guardrail from a synchronous predicate over the text.
    ///
    /// `predicate` returns `Some(info)` to trip.
    pub fn sync<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str, &RunContext) -> Option<Value> + Send + Sync + 'static,
    {
        Self::new(name, move |input| {
            let outcome = match predicate(input.text, input.context) {
                Some(info) => GuardrailOutcome::trip(info),
                None => GuardrailOutcome::pass(),
            };
            Box::pin(std::future::ready(Ok(outcome)))
        })
    }

    /// A guardrail from an owned async predicate over the text.
    pub fn from_async<F, Fut>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(String, RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolkitResult<GuardrailOutcome>> + Send + 'static,
    {
        Self::new(name, move |input| {
            Box::pin(predicate(input.text.to_string(), input.context.clone()))
        })
    }
}

#[async_trait]
impl Guardrail for FnGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, input: &GuardrailInput<'_>) -> ToolkitResult<GuardrailOutcome> {
        (self.check)(input).await
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
