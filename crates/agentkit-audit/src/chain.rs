//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. log_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of record (serde_json with no pretty-printing)

use sha2::{Digest, Sha256};

use agentkit_contracts::error::{ToolkitError, ToolkitResult};

use crate::event::{AuditEvent, EventRecord};

/// Compute the SHA-256 hash for a single audit entry.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_event(
    log_id: &str,
    sequence: u64,
    record: &EventRecord,
    prev_hash: &str,
) -> ToolkitResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| ToolkitError::Storage {
        reason: format!("failed to serialize audit record: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(log_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain.
///
/// Valid when every entry's `prev_hash` equals the previous entry's
/// `this_hash` (or `GENESIS_HASH` for the first), every `this_hash` matches
/// the value recomputed from the entry's fields, and sequence numbers run
/// 0, 1, 2, ... An empty chain is valid.
pub fn verify_chain(events: &[AuditEvent]) -> bool {
    let mut expected_prev = AuditEvent::GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        if event.sequence != position as u64 || event.prev_hash != expected_prev {
            return false;
        }

        match hash_event(&event.log_id, event.sequence, &event.record, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = event.this_hash.clone();
    }

    true
}
