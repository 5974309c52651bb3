//! Simulated tools for the reference scenarios.
//!
//! All data is hardcoded and fictional. No external services are contacted.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use agentkit_contracts::error::ToolkitError;
use agentkit_core::Tool;

use crate::calculator::{evaluate, format_number};

// ── Prompt parsing ───────────────────────────────────────────────────────────

fn capture(pattern: &'static OnceLock<Option<Regex>>, source: &str, prompt: &str) -> Option<String> {
    pattern
        .get_or_init(|| Regex::new(source).ok())
        .as_ref()?
        .captures(prompt)
        .map(|c| c[1].trim().to_string())
}

/// The capitalised place name after "in" or "for", e.g. "San Francisco".
pub fn location_in(prompt: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    capture(&PATTERN, r"\b(?:in|for) ([A-Z][A-Za-z ]*[A-Za-z])", prompt)
}

/// The word after "latest", e.g. "tech".
pub fn topic_in(prompt: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    capture(&PATTERN, r"(?i)\blatest (\w+)", prompt)
}

/// The arithmetic tail of a prompt, from the first digit or parenthesis.
pub fn expression_in(prompt: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    capture(&PATTERN, r"([-(\d][-+*/().\d\s]*)", prompt)
}

// ── Weather (mock) ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LocationArgs {
    location: String,
}

/// Current conditions for a location.
pub fn weather_tool() -> Tool {
    Tool::typed(
        "get_weather",
        "Get weather information for a location",
        json!({
            "type": "object",
            "properties": { "location": { "type": "string", "description": "City name" } },
            "required": ["location"]
        }),
        |args: LocationArgs, _ctx, _meta| async move {
            Ok(format!("The weather in {} is sunny and 22°C", args.location))
        },
    )
}

pub fn forecast_tool() -> Tool {
    Tool::typed(
        "get_forecast",
        "Get 5-day weather forecast",
        json!({
            "type": "object",
            "properties": { "location": { "type": "string" } },
            "required": ["location"]
        }),
        |args: LocationArgs, _ctx, _meta| async move {
            Ok(format!(
                "5-day forecast for {}: mostly sunny, 20-24°C",
                args.location
            ))
        },
    )
}

// ── News (mock) ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TopicArgs {
    topic: String,
}

pub fn news_tool() -> Tool {
    Tool::typed(
        "get_news",
        "Get latest news",
        json!({
            "type": "object",
            "properties": { "topic": { "type": "string" } },
            "required": ["topic"]
        }),
        |args: TopicArgs, _ctx, _meta| async move {
            Ok(format!(
                "Latest {} news: open-source model release tops the charts",
                args.topic
            ))
        },
    )
}

// ── Calculator ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExpressionArgs {
    expression: String,
}

/// Arithmetic over `+ - * /` and parentheses via the restricted evaluator.
pub fn calculator_tool() -> Tool {
    Tool::typed(
        "calculate",
        "Perform mathematical calculations",
        json!({
            "type": "object",
            "properties": { "expression": { "type": "string" } },
            "required": ["expression"]
        }),
        |args: ExpressionArgs, _ctx, _meta| async move {
            let value = evaluate(&args.expression)
                .map_err(|e| ToolkitError::tool_failed("calculate", e))?;
            Ok(format!("{} = {}", args.expression.trim(), format_number(value)))
        },
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use agentkit_contracts::agent::RunContext;
    use agentkit_core::tool::ToolCallMeta;

    use super::*;

    #[test]
    fn prompt_parsing() {
        assert_eq!(location_in("Give me a 5-day forecast for New York").as_deref(), Some("New York"));
        assert_eq!(location_in("What is the weather in Tokyo?").as_deref(), Some("Tokyo"));
        assert_eq!(location_in("weather please"), None);
        assert_eq!(topic_in("What are the latest tech news?").as_deref(), Some("tech"));
        assert_eq!(expression_in("Calculate 15 * 24 + 100").as_deref(), Some("15 * 24 + 100"));
        assert_eq!(expression_in("no numbers here"), None);
    }

    #[tokio::test]
    async fn calculator_formats_the_result() {
        let result = calculator_tool()
            .invoke(json!({ "expression": "15 * 24 + 100" }), &RunContext::new(), ToolCallMeta::default())
            .await
            .unwrap();
        assert_eq!(result, json!("15 * 24 + 100 = 460"));
    }

    #[tokio::test]
    async fn calculator_rejects_code() {
        let err = calculator_tool()
            .invoke(json!({ "expression": "require('fs')" }), &RunContext::new(), ToolCallMeta::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "tool-failed");
    }
}
