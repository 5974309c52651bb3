//! Scenario 2: Orchestrator with specialist handoffs
//!
//! An orchestrator routes each query to the Weather, News, or Math
//! specialist through the handoff tool. The specialist's answer becomes the
//! turn's answer; queries no specialist claims are answered directly.
//!
//! Routing uses each specialist's own `match_on` rules, so the same keywords
//! decide which agent the orchestrator's model picks.

use std::sync::Arc;

use serde_json::json;

use agentkit_contracts::{error::ToolkitResult, event::AgentEvent};
use agentkit_core::{
    events::{FanoutSink, FnSink, RecordingSink},
    routing::{MatchOn, Pattern},
    traits::EventSink,
    Agent, GenerateOptions, ToolLoopEngine,
};

use crate::{
    mock_data::{
        calculator_tool, expression_in, forecast_tool, location_in, news_tool, topic_in,
        weather_tool,
    },
    models::{RouterModel, ToolUseModel},
};

pub const QUERIES: [&str; 5] = [
    "What is the weather in San Francisco?",
    "Calculate 15 * 24 + 100",
    "What are the latest tech news?",
    "Give me a 5-day forecast for New York",
    "Tell me a joke",
];

/// One answered query.
#[derive(Debug, Clone)]
pub struct RoutedAnswer {
    pub query: String,
    /// The agent whose exchange produced the answer.
    pub agent: String,
    pub handoffs: Vec<String>,
    pub text: String,
    pub total_tokens: u64,
    pub duration_ms: i64,
}

fn weather_agent() -> ToolkitResult<Agent> {
    let model = ToolUseModel::new(|prompt| {
        let location = location_in(prompt)?;
        let tool = if prompt.to_lowercase().contains("forecast") {
            "get_forecast"
        } else {
            "get_weather"
        };
        Some((tool, json!({ "location": location })))
    })
    .with_fallback("Which location should I check?");

    Agent::builder("Weather", Arc::new(ToolLoopEngine::new(model)))
        .instructions(
            "You are a weather specialist. Use get_weather for current conditions \
             and get_forecast for future predictions.",
        )
        .tool(weather_tool())
        .tool(forecast_tool())
        .handoff_description("Weather and climate queries")
        .match_on(MatchOn::Patterns(vec![
            Pattern::keyword("weather"),
            Pattern::keyword("forecast"),
            Pattern::keyword("temperature"),
            Pattern::regex(r"(?i)climate")?,
        ]))
        .build()
}

fn news_agent() -> ToolkitResult<Agent> {
    let model = ToolUseModel::new(|prompt| {
        let topic = topic_in(prompt).unwrap_or_else(|| "general".to_string());
        Some(("get_news", json!({ "topic": topic })))
    });

    Agent::builder("News", Arc::new(ToolLoopEngine::new(model)))
        .instructions("You are a news specialist. Provide current news and information.")
        .tool(news_tool())
        .handoff_description("News and current events")
        .match_on(MatchOn::keywords(["news", "article", "headline"]))
        .build()
}

fn math_agent() -> ToolkitResult<Agent> {
    let model = ToolUseModel::new(|prompt| {
        expression_in(prompt).map(|expression| ("calculate", json!({ "expression": expression })))
    })
    .with_fallback("Please give me an expression to evaluate.");

    Agent::builder("Math", Arc::new(ToolLoopEngine::new(model)))
        .instructions("You are a math specialist. Solve mathematical problems and calculations.")
        .tool(calculator_tool())
        .handoff_description("Mathematical calculations")
        .match_on(MatchOn::Patterns(vec![
            Pattern::keyword("calculate"),
            Pattern::keyword("math"),
            Pattern::regex(r"\d+\s*[-+*/]\s*\d+")?,
        ]))
        .build()
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::AgentStart { agent, round } => println!("    {} - round {}", agent, round),
        AgentEvent::AgentHandoff { from, to, reason } => {
            println!("    handoff: {} -> {}", from, to);
            if let Some(reason) = reason {
                println!("      reason: {}", reason);
            }
        }
        _ => {}
    }
}

/// Build the orchestrator and its three specialists.
///
/// `sink` observes the orchestrator's events.
pub fn build_orchestrator(sink: Arc<dyn EventSink>) -> ToolkitResult<Agent> {
    let specialists = vec![
        Arc::new(weather_agent()?),
        Arc::new(news_agent()?),
        Arc::new(math_agent()?),
    ];

    let router = RouterModel::new(specialists.clone());
    let mut builder = Agent::builder("Orchestrator", Arc::new(ToolLoopEngine::new(router)))
        .instructions(
            "You are an intelligent orchestrator that routes queries to specialist agents. \
             Analyze the user's query and hand off to the appropriate specialist.",
        )
        .on_event(sink);
    for specialist in specialists {
        builder = builder.handoff(specialist);
    }
    builder.build()
}

/// Answer every query in `QUERIES`; also returns the orchestrator's events.
pub async fn run() -> ToolkitResult<(Vec<RoutedAnswer>, RecordingSink)> {
    let recording = RecordingSink::new();
    let recording_sink: Arc<dyn EventSink> = Arc::new(recording.clone());
    let sink = FanoutSink::new(vec![recording_sink]).with(Arc::new(FnSink::new(|event| async move {
        print_event(&event);
        Ok(())
    })));
    let orchestrator = build_orchestrator(Arc::new(sink))?;

    let mut answers = Vec::with_capacity(QUERIES.len());
    for query in QUERIES {
        println!("  Query: \"{}\"", query);
        let result = orchestrator.generate(GenerateOptions::new(query)).await?;
        println!("  Answer ({}): {}", result.agent, result.text);
        println!();

        answers.push(RoutedAnswer {
            query: query.to_string(),
            agent: result.agent,
            handoffs: result.handoffs,
            text: result.text,
            total_tokens: result.usage.total_tokens,
            duration_ms: result.metadata.duration_ms,
        });
    }
    Ok((answers, recording))
}

/// Run Scenario 2 and print its outcome.
pub async fn run_scenario() -> ToolkitResult<()> {
    println!("=== Scenario 2: Multi-Agent Orchestration (handoffs) ===");
    println!();

    let (answers, events) = run().await?;

    let handed_off = answers.iter().filter(|a| !a.handoffs.is_empty()).count();
    println!(
        "  {} of {} queries handed off; {} lifecycle event(s) observed",
        handed_off,
        answers.len(),
        events.events().len()
    );
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer<'a>(answers: &'a [RoutedAnswer], query: &str) -> &'a RoutedAnswer {
        answers.iter().find(|a| a.query == query).unwrap()
    }

    #[tokio::test]
    async fn each_query_reaches_the_right_specialist() {
        let (answers, _) = run().await.unwrap();

        let weather = answer(&answers, QUERIES[0]);
        assert_eq!(weather.agent, "Weather");
        assert_eq!(weather.handoffs, vec!["Weather"]);
        assert_eq!(weather.text, "The weather in San Francisco is sunny and 22°C");

        let math = answer(&answers, QUERIES[1]);
        assert_eq!(math.agent, "Math");
        assert_eq!(math.text, "15 * 24 + 100 = 460");

        let news = answer(&answers, QUERIES[2]);
        assert_eq!(news.agent, "News");
        assert!(news.text.starts_with("Latest tech news"));

        let forecast = answer(&answers, QUERIES[3]);
        assert_eq!(forecast.agent, "Weather");
        assert!(forecast.text.starts_with("5-day forecast for New York"));
    }

    #[tokio::test]
    async fn unrouted_query_is_answered_by_the_orchestrator() {
        let (answers, _) = run().await.unwrap();

        let joke = answer(&answers, QUERIES[4]);
        assert_eq!(joke.agent, "Orchestrator");
        assert!(joke.handoffs.is_empty());
    }

    #[tokio::test]
    async fn usage_includes_the_delegated_exchange() {
        let (answers, _) = run().await.unwrap();
        assert!(answers[0].total_tokens > 0);
    }

    #[tokio::test]
    async fn orchestrator_emits_one_handoff_per_routed_query() {
        let (_, events) = run().await.unwrap();

        let handoffs: Vec<(String, String)> = events
            .events()
            .into_iter()
            .filter_map(|e| match e {
                AgentEvent::AgentHandoff { from, to, .. } => Some((from, to)),
                _ => None,
            })
            .collect();

        assert_eq!(
            handoffs,
            vec![
                ("Orchestrator".to_string(), "Weather".to_string()),
                ("Orchestrator".to_string(), "Math".to_string()),
                ("Orchestrator".to_string(), "News".to_string()),
                ("Orchestrator".to_string(), "Weather".to_string()),
            ]
        );
    }
}
