//! # agentkit-audit
//!
//! Append-only, SHA-256 hash-chained log of agent lifecycle events.
//!
//! ## Overview
//!
//! Every event an agent emits is wrapped in an `AuditEvent` that links to the
//! previous entry via its SHA-256 hash. Tampering with any entry, even a
//! single byte, breaks the chain and is detected by `verify_chain`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentkit_audit::EventLogSink;
//!
//! let log = EventLogSink::new("session-001");
//! let agent = Agent::builder("Assistant", engine)
//!     .on_event(Arc::new(log.clone()))
//!     .build()?;
//! agent.generate("hello").await?;
//!
//! assert!(log.verify_integrity());
//! let sealed = log.export_log()?;
//! ```

pub mod chain;
pub mod event;
pub mod sink;

pub use chain::{hash_event, verify_chain};
pub use event::{AuditEvent, AuditLog, EventRecord};
pub use sink::EventLogSink;

// ── Tests ─────────────────────────────────────────────────────────────────────
