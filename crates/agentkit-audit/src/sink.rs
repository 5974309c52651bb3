//! `EventLogSink`: an `EventSink` that appends every lifecycle event to an
//! in-memory SHA-256 hash chain.
//!
//! Clones share the same chain, so one sink can be handed to several agents
//! and still produce a single ordered log.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use agentkit_contracts::{
    error::{ToolkitError, ToolkitResult},
    event::AgentEvent,
};
use agentkit_core::traits::EventSink;

use crate::{
    chain::{hash_event, verify_chain},
    event::{AuditEvent, AuditLog, EventRecord},
};

// ── Internal mutable state ────────────────────────────────────────────────────

struct LogState {
    events: Vec<AuditEvent>,
    /// The next sequence number to assign.
    sequence: u64,
    /// `this_hash` of the last entry, or `GENESIS_HASH` before the first.
    last_hash: String,
}

// ── Public sink ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct EventLogSink {
    log_id: String,
    state: Arc<Mutex<LogState>>,
}

impl EventLogSink {
    pub fn new(log_id: impl Into<String>) -> Self {
        Self {
            log_id: log_id.into(),
            state: Arc::new(Mutex::new(LogState {
                events: Vec::new(),
                sequence: 0,
                last_hash: AuditEvent::GENESIS_HASH.to_string(),
            })),
        }
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    /// Append one event to the chain.
    pub fn append(&self, event: &AgentEvent) -> ToolkitResult<()> {
        let mut state = self.lock()?;

        let record = EventRecord {
            event: event.clone(),
            timestamp: Utc::now(),
        };
        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash = hash_event(&self.log_id, sequence, &record, &prev_hash)?;

        debug!(
            log_id = %self.log_id,
            sequence,
            event = event.kind(),
            "event appended"
        );

        state.events.push(AuditEvent {
            sequence,
            log_id: self.log_id.clone(),
            record,
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash;

        Ok(())
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.lock().map(|s| s.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A sealed snapshot of every entry written so far.
    pub fn export_log(&self) -> ToolkitResult<AuditLog> {
        let state = self.lock()?;
        let terminal_hash = state
            .events
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();

        info!(
            log_id = %self.log_id,
            event_count = state.events.len(),
            terminal_hash = %terminal_hash,
            "event log exported"
        );

        Ok(AuditLog {
            log_id: self.log_id.clone(),
            events: state.events.clone(),
            finalized_at: Utc::now(),
            terminal_hash,
        })
    }

    /// Whether the in-memory chain is intact.
    pub fn verify_integrity(&self) -> bool {
        self.lock().map(|s| verify_chain(&s.events)).unwrap_or(false)
    }

    fn lock(&self) -> ToolkitResult<MutexGuard<'_, LogState>> {
        self.state.lock().map_err(|e| ToolkitError::Storage {
            reason: format!("event log lock poisoned: {}", e),
        })
    }

    #[cfg(test)]
    pub(crate) fn tamper<F: FnOnce(&mut Vec<AuditEvent>)>(&self, f: F) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state.events);
        }
    }
}

#[async_trait]
impl EventSink for EventLogSink {
    async fn emit(&self, event: &AgentEvent) -> ToolkitResult<()> {
        self.append(event)
    }
}
