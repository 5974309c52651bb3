//! Sliding-window rate limiting.
//!
//! `RateLimiter` is the shared window store; `RateLimitGuardrail` consults it
//! once per prompt. Several guardrails (or agents) may share one limiter via
//! `Arc` so a user's budget is counted across all of them.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;
use tracing::warn;

use agentkit_contracts::{
    agent::RunContext,
    error::{ToolkitError, ToolkitResult},
    guardrail::GuardrailOutcome,
};
use agentkit_core::{guardrail::GuardrailInput, traits::Guardrail};

/// Identifier used when the context carries none.
pub const DEFAULT_IDENTIFIER: &str = "default";

/// Per-identifier request timestamps within a sliding window.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> ToolkitResult<Self> {
        if max_requests == 0 {
            return Err(ToolkitError::Config {
                reason: "rate limiter max_requests must be at least 1".to_string(),
            });
        }
        if window.is_zero() {
            return Err(ToolkitError::Config {
                reason: "rate limiter window must be non-zero".to_string(),
            });
        }
        Ok(Self {
            max_requests,
            window,
            requests: Mutex::new(HashMap::new()),
        })
    }

    /// Record a request for `identifier` if the window has room.
    ///
    /// Returns false, recording nothing, when the limit is already reached.
    pub fn try_acquire(&self, identifier: &str) -> ToolkitResult<bool> {
        let now = Instant::now();
        let mut requests = self.lock()?;
        let window = requests.entry(identifier.to_string()).or_default();
        Self::evict(window, now, self.window);

        if window.len() >= self.max_requests {
            return Ok(false);
        }
        window.push_back(now);
        Ok(true)
    }

    /// Requests still available to `identifier` in the current window.
    pub fn remaining(&self, identifier: &str) -> ToolkitResult<usize> {
        let now = Instant::now();
        let mut requests = self.lock()?;
        let used = match requests.get_mut(identifier) {
            Some(window) => {
                Self::evict(window, now, self.window);
                window.len()
            }
            None => 0,
        };
        Ok(self.max_requests.saturating_sub(used))
    }

    /// Forget every recorded request.
    pub fn clear(&self) -> ToolkitResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn evict(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
        while window
            .front()
            .is_some_and(|&t| now.duration_since(t) >= span)
        {
            window.pop_front();
        }
    }

    fn lock(&self) -> ToolkitResult<std::sync::MutexGuard<'_, HashMap<String, VecDeque<Instant>>>> {
        self.requests.lock().map_err(|_| ToolkitError::Storage {
            reason: "rate limiter state lock poisoned".to_string(),
        })
    }
}

type IdentifierFn = dyn Fn(&RunContext) -> String + Send + Sync;

/// Trips once an identifier exceeds its request budget (`rate-limiter`).
///
/// Info: `{reason: "Rate limit exceeded", identifier, remaining}`.
pub struct RateLimitGuardrail {
    limiter: Arc<RateLimiter>,
    identifier: Box<IdentifierFn>,
}

impl RateLimitGuardrail {
    /// Limit by `RunContext::user_id`, falling back to `"default"`.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self::with_identifier(limiter, |ctx| {
            ctx.user_id
                .clone()
                .unwrap_or_else(|| DEFAULT_IDENTIFIER.to_string())
        })
    }

    pub fn with_identifier<F>(limiter: Arc<RateLimiter>, identifier: F) -> Self
    where
        F: Fn(&RunContext) -> String + Send + Sync + 'static,
    {
        Self {
            limiter,
            identifier: Box::new(identifier),
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

#[async_trait]
impl Guardrail for RateLimitGuardrail {
    fn name(&self) -> &str {
        "rate-limiter"
    }

    async fn check(&self, input: &GuardrailInput<'_>) -> ToolkitResult<GuardrailOutcome> {
        let identifier = (self.identifier)(input.context);
        if self.limiter.try_acquire(&identifier)? {
            return Ok(GuardrailOutcome::pass());
        }

        let remaining = self.limiter.remaining(&identifier)?;
        warn!(identifier = %identifier, "rate limit exceeded");
        Ok(GuardrailOutcome::trip(json!({
            "reason": "Rate limit exceeded",
            "identifier": identifier,
            "remaining": remaining,
        })))
    }
}
