//! Deterministic chat models standing in for a hosted LLM.
//!
//! Each model decides from the request alone, so one instance can serve
//! concurrent turns.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use agentkit_contracts::{
    error::ToolkitResult,
    execution::Usage,
    message::{Message, Role},
};
use agentkit_core::{
    engine::{ChatRequest, ChatResponse},
    handoff::HANDOFF_TOOL_NAME,
    routing::route,
    traits::ChatModel,
    Agent,
};

type PlanFn = dyn Fn(&str) -> Option<(&'static str, Value)> + Send + Sync;

fn last_tool_result(request: &ChatRequest) -> Option<&Message> {
    request.messages.last().filter(|m| m.role == Role::Tool)
}

fn usage_for(request: &ChatRequest, reply: &str) -> Usage {
    let prompt: usize = request.messages.iter().map(|m| m.content.len()).sum();
    Usage::new((prompt / 4) as u64, (reply.len() / 4).max(1) as u64)
}

/// Plans one tool call from the prompt, then answers with the tool's result.
///
/// When the planner returns `None` it answers `fallback` directly.
pub struct ToolUseModel {
    plan: Box<PlanFn>,
    fallback: String,
    system_prompts: Mutex<Vec<String>>,
}

impl ToolUseModel {
    pub fn new<F>(plan: F) -> Self
    where
        F: Fn(&str) -> Option<(&'static str, Value)> + Send + Sync + 'static,
    {
        Self {
            plan: Box::new(plan),
            fallback: "I can't help with that.".to_string(),
            system_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// The system message of every request served, in order.
    pub fn system_prompts(&self) -> Vec<String> {
        self.system_prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ToolUseModel {
    async fn complete(&self, request: ChatRequest) -> ToolkitResult<ChatResponse> {
        if let Ok(mut prompts) = self.system_prompts.lock() {
            prompts.push(request.system_message().unwrap_or_default().to_string());
        }

        if let Some(result) = last_tool_result(&request) {
            let usage = usage_for(&request, &result.content);
            return Ok(ChatResponse::text(result.content.clone()).with_usage(usage));
        }

        let prompt = request.last_user_message().unwrap_or_default();
        match (self.plan)(prompt) {
            Some((tool, args)) => Ok(ChatResponse::tool_call(tool, args)
                .with_usage(usage_for(&request, ""))),
            None => {
                let usage = usage_for(&request, &self.fallback);
                Ok(ChatResponse::text(self.fallback.clone()).with_usage(usage))
            }
        }
    }
}

/// Picks a specialist with the agents' own routing rules and requests a
/// handoff to it.
pub struct RouterModel {
    specialists: Vec<Arc<Agent>>,
}

impl RouterModel {
    pub fn new(specialists: Vec<Arc<Agent>>) -> Self {
        Self { specialists }
    }
}

#[async_trait]
impl ChatModel for RouterModel {
    async fn complete(&self, request: ChatRequest) -> ToolkitResult<ChatResponse> {
        if last_tool_result(&request).is_some() {
            return Ok(ChatResponse::text("Transferring you to a specialist."));
        }

        let prompt = request.last_user_message().unwrap_or_default();
        let Some(target) = route(&self.specialists, prompt) else {
            return Ok(ChatResponse::text(
                "I can route weather, news, and math questions.",
            ));
        };

        Ok(ChatResponse::tool_call(
            HANDOFF_TOOL_NAME,
            json!({
                "targetAgent": target.name(),
                "context": format!("User asked: {prompt}"),
                "reason": format!("{} matches the request", target.name()),
            }),
        )
        .with_usage(usage_for(&request, "")))
    }
}
