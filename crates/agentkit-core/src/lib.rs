//! # agentkit-core
//!
//! The agent orchestration and control-transfer engine.
//!
//! This crate provides:
//! - The trait seams (`ReasoningEngine`, `ChatModel`, `Guardrail`, `EventSink`)
//! - The tool adapter (`Tool`, `ToolSet`) with schema validation and approval gating
//! - The guardrail pipeline (`run_guardrails`)
//! - The handoff mechanism (`handoff_tool`, `Handoff`)
//! - The `Agent` turn state machine and its builder
//! - `ToolLoopEngine`, the bounded tool-calling loop over a `ChatModel`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentkit_core::{Agent, ToolLoopEngine, engine::{ChatResponse, ScriptedModel}};
//!
//! let engine = Arc::new(ToolLoopEngine::new(ScriptedModel::new([ChatResponse::text("hi")])));
//! let agent = Agent::builder("Assistant", engine).instructions("Be brief.").build()?;
//! let result = agent.generate("hello").await?;
//! ```

pub mod agent;
pub mod config;
pub mod engine;
pub mod events;
pub mod guardrail;
pub mod handoff;
pub mod routing;
pub mod tool;
pub mod traits;

pub use agent::{Agent, AgentBuilder, GenerateOptions, Instructions, Tools};
pub use config::AgentSettings;
pub use engine::ToolLoopEngine;
pub use handoff::Handoff;
pub use tool::{Tool, ToolSet};
