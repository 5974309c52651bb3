//! Reference scenarios.
//!
//! Each scenario is a self-contained module that wires real agentkit
//! components (agents, tool cache, working memory, guardrails, event log)
//! to deterministic mock models and demonstrates a distinct feature.

pub mod basic;
pub mod guardrails;
pub mod multi_agent;
