//! Audit entry and log types.
//!
//! `AuditEvent` wraps one lifecycle event with sequence numbering and the
//! SHA-256 hashes that make tampering detectable. `AuditLog` is the sealed
//! snapshot produced by `EventLogSink::export_log`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentkit_contracts::event::AgentEvent;

/// A lifecycle event as received, with the time it reached the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: AgentEvent,
    pub timestamp: DateTime<Utc>,
}

/// A single entry in the hash chain of one event log.
///
/// Modifying any field, including the embedded `record`, invalidates
/// `this_hash` and every later `prev_hash`, which `verify_chain` detects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    /// The log this entry belongs to.
    pub log_id: String,

    pub record: EventRecord,

    /// `this_hash` of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// SHA-256 (hex) over (log_id, sequence, prev_hash, canonical JSON of record).
    pub this_hash: String,
}

impl AuditEvent {
    /// The `prev_hash` of the first entry in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A sealed snapshot of an event log.
///
/// `terminal_hash` is the `this_hash` of the last entry and commits to the
/// whole log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub log_id: String,

    /// All entries in chain order (sequence 0 first).
    pub events: Vec<AuditEvent>,

    pub finalized_at: DateTime<Utc>,

    /// Empty string if the log is empty.
    pub terminal_hash: String,
}
