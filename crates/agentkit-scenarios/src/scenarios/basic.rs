//! Scenario 1: Weather assistant with caching and working memory
//!
//! Pipeline walk-through for the demo run:
//!   1. "Weather in Tokyo?" runs the weather tool (cache miss)
//!   2. The same question again is served from the tool cache (hit)
//!   3. A preference is saved to chat-scoped working memory
//!   4. "Weather in Osaka?" runs with the memory injected into the system
//!      message
//!   5. Every lifecycle event lands in a hash-chained event log, verified at
//!      the end

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use agentkit_audit::EventLogSink;
use agentkit_cache::{cached, CacheOptions, CacheStats, DEFAULT_TTL};
use agentkit_contracts::{agent::RunContext, error::ToolkitResult, event::AgentEvent};
use agentkit_core::{
    events::{FanoutSink, FnSink},
    traits::EventSink,
    Agent, GenerateOptions, ToolLoopEngine,
};
use agentkit_memory::{memory_instructions, InMemoryStore, MemoryScope, MemoryStats, MemoryStore};

use crate::{
    mock_data::{location_in, weather_tool},
    models::ToolUseModel,
};

pub const CHAT_ID: &str = "chat-123";

pub const PREFERENCES: &str = "# User Preferences
- User prefers Celsius over Fahrenheit
- Interested in Japanese weather";

/// What the scenario observed.
#[derive(Debug, Clone)]
pub struct BasicReport {
    pub responses: Vec<String>,
    pub cache: CacheStats,
    pub memory: MemoryStats,
    /// Whether the final turn's system message carried the saved preferences.
    pub memory_injected: bool,
    pub audit_events: usize,
    pub audit_verified: bool,
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::AgentStart { agent, round } => {
            println!("    agent \"{}\" started (round {})", agent, round)
        }
        AgentEvent::ToolStart { tool_name, .. } => println!("    calling tool: {}", tool_name),
        AgentEvent::AgentEnd { agent, .. } => println!("    agent \"{}\" completed", agent),
        AgentEvent::AgentError { message, .. } => println!("    error: {}", message),
        _ => {}
    }
}

/// Run the scenario and return what it observed.
pub async fn run() -> ToolkitResult<BasicReport> {
    // ── Wire up the components ───────────────────────────────────────────────

    let (weather, cache) = cached(
        &weather_tool(),
        CacheOptions::new()
            .ttl(DEFAULT_TTL)
            .on_hit(|key| info!(key, "weather served from cache"))
            .on_miss(|key| info!(key, "weather fetched")),
    )?;

    let memory = Arc::new(InMemoryStore::new());
    let store: Arc<dyn MemoryStore> = memory.clone();

    let audit = EventLogSink::new(CHAT_ID);
    let audit_sink: Arc<dyn EventSink> = Arc::new(audit.clone());
    let sink = FanoutSink::new(vec![audit_sink]).with(Arc::new(FnSink::new(
        |event| async move {
            print_event(&event);
            Ok(())
        },
    )));

    let model = Arc::new(
        ToolUseModel::new(|prompt| {
            location_in(prompt).map(|location| ("get_weather", json!({ "location": location })))
        })
        .with_fallback("Which city would you like the weather for?"),
    );

    let agent = Agent::builder("Assistant", Arc::new(ToolLoopEngine::new(Arc::clone(&model))))
        .instructions(memory_instructions(
            "You are a helpful weather assistant.",
            Arc::clone(&store),
            MemoryScope::Chat,
        ))
        .tool(weather)
        .on_event(Arc::new(sink))
        .build()?;

    let ctx = RunContext::new().with_chat_id(CHAT_ID);
    let ask = |prompt: &str| GenerateOptions::new(prompt).with_context(ctx.clone());

    // ── Turns ────────────────────────────────────────────────────────────────

    let mut responses = Vec::new();

    println!("  Query 1: What is the weather in Tokyo?");
    responses.push(agent.generate(ask("What is the weather in Tokyo?")).await?.text);
    println!("  Response: {}", responses[0]);
    println!();

    println!("  Query 2: What is the weather in Tokyo? (should use cache)");
    responses.push(agent.generate(ask("What is the weather in Tokyo?")).await?.text);
    println!("  Response: {}", responses[1]);
    println!();

    println!("  Saving preference to working memory...");
    store
        .update_working_memory(MemoryScope::Chat, &ctx, PREFERENCES)
        .await?;
    println!();

    println!("  Query 3: What is the weather in Osaka?");
    responses.push(agent.generate(ask("What is the weather in Osaka?")).await?.text);
    println!("  Response: {}", responses[2]);
    println!();

    Ok(BasicReport {
        responses,
        cache: cache.stats().await?,
        memory: memory.stats()?,
        memory_injected: model
            .system_prompts()
            .last()
            .is_some_and(|system| system.contains(PREFERENCES)),
        audit_events: audit.len(),
        audit_verified: audit.verify_integrity(),
    })
}

/// Run Scenario 1 and print its outcome.
pub async fn run_scenario() -> ToolkitResult<()> {
    println!("=== Scenario 1: Weather Assistant (cache + memory) ===");
    println!();

    let report = run().await?;

    println!(
        "  Cache:  {} hit(s), {} miss(es), hit rate {:.1}%, size {}/{}",
        report.cache.hits,
        report.cache.misses,
        report.cache.hit_rate * 100.0,
        report.cache.size,
        report.cache.max_size
    );
    println!(
        "  Memory: {} working memory entr(ies), {} message(s), {} chat(s)",
        report.memory.working_memory_count, report.memory.message_count, report.memory.chat_count
    );
    println!(
        "  Event log integrity: {} ({} event(s) in chain)",
        if report.audit_verified { "VERIFIED" } else { "FAILED" },
        report.audit_events
    );
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repeat_question_hits_cache_and_memory_is_injected() {
        let report = run().await.unwrap();

        assert_eq!(report.responses[0], "The weather in Tokyo is sunny and 22°C");
        assert_eq!(report.responses[1], report.responses[0]);
        assert_eq!(report.responses[2], "The weather in Osaka is sunny and 22°C");

        assert_eq!((report.cache.hits, report.cache.misses, report.cache.size), (1, 2, 2));
        assert_eq!(report.memory.working_memory_count, 1);
        assert!(report.memory_injected);

        // Three turns of agent-start, tool-start, tool-end, agent-end.
        assert_eq!(report.audit_events, 12);
        assert!(report.audit_verified);
    }
}
