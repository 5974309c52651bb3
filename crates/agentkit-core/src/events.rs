//! Event sink adapters.
//!
//! The agent emits through `emit_best_effort`, which awaits the sink and logs
//! a failure instead of returning it.

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use tracing::warn;

use agentkit_contracts::{
    error::{ToolkitError, ToolkitResult},
    event::AgentEvent,
};

use crate::traits::EventSink;

/// Emit `event` to `sink` if there is one, ignoring failure.
pub(crate) async fn emit_best_effort(sink: Option<&Arc<dyn EventSink>>, event: AgentEvent) {
    let Some(sink) = sink else {
        return;
    };
    if let Err(e) = sink.emit(&event).await {
        warn!(event = event.kind(), error = %e, "event sink failed");
    }
}

type SinkFn = dyn Fn(AgentEvent) -> BoxFuture<'static, ToolkitResult<()>> + Send + Sync;

/// An event sink from an async closure.
pub struct FnSink {
    f: Box<SinkFn>,
}

impl FnSink {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(AgentEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolkitResult<()>> + Send + 'static,
    {
        Self {
            f: Box::new(move |event| Box::pin(f(event))),
        }
    }
}

#[async_trait]
impl EventSink for FnSink {
    async fn emit(&self, event: &AgentEvent) -> ToolkitResult<()> {
        (self.f)(event.clone()).await
    }
}

/// Broadcasts every event to each inner sink.
///
/// All sinks are called even when one fails; the first failure is returned.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl EventSink for FanoutSink {
    async fn emit(&self, event: &AgentEvent) -> ToolkitResult<()> {
        let outcomes = join_all(self.sinks.iter().map(|s| s.emit(event))).await;
        outcomes.into_iter().collect()
    }
}

/// Records every event it receives. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AgentEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// The kebab-case tag of each recorded event, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|e| e.iter().map(AgentEvent::kind).collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: &AgentEvent) -> ToolkitResult<()> {
        self.events
            .lock()
            .map_err(|_| ToolkitError::Storage {
                reason: "recording sink lock poisoned".to_string(),
            })?
            .push(event.clone());
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
