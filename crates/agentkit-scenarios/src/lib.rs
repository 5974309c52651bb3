//! # agentkit-scenarios
//!
//! Reference scenarios for the agentkit runtime.
//!
//! 1. **Weather assistant**: tool caching, working memory injected into the
//!    system message, and a hash-chained event log.
//! 2. **Multi-agent orchestration**: an orchestrator hands each query off to
//!    the Weather, News, or Math specialist.
//! 3. **Guardrails**: TOML-configured input and output guardrails rejecting
//!    PII, profanity, over-long answers, and bursts of requests.
//!
//! Models are deterministic stand-ins; no external API calls are made.

pub mod calculator;
pub mod mock_data;
pub mod models;
pub mod scenarios;
