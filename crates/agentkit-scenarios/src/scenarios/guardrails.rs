//! Scenario 3: Guardrail rejections
//!
//! A support assistant runs behind guardrails loaded from TOML:
//!
//!   input:  rate-limiter (5 per minute), pii-detector, content-filter
//!   output: content-filter, length-validator (max 200 chars)
//!
//! Six prompts walk through every outcome: a clean answer, PII in the
//! prompt, profanity in the prompt, an over-long answer, another clean
//! answer, and finally a request over the rate limit. Rejected inputs never
//! reach the model.

use std::sync::Arc;

use agentkit_contracts::{
    agent::RunContext,
    error::{ToolkitError, ToolkitResult},
    guardrail::GuardrailPhase,
};
use agentkit_core::{
    engine::{ChatResponse, ScriptedModel},
    Agent, GenerateOptions, ToolLoopEngine,
};
use agentkit_guardrails::GuardrailSet;

/// Embedded guardrail configuration for the support assistant.
const GUARDRAILS: &str = include_str!("../../config/guardrails.toml");

pub const USER_ID: &str = "user-42";

/// How one prompt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Answered(String),
    Rejected {
        guardrail: String,
        phase: GuardrailPhase,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct GuardrailCase {
    pub label: &'static str,
    pub prompt: &'static str,
    pub verdict: Verdict,
}

const CASES: [(&str, &str); 6] = [
    ("clean request", "How do I reset my password?"),
    ("PII in input", "My SSN is 123-45-6789, can you update my account?"),
    ("profanity in input", "Why the hell is checkout broken?"),
    ("over-long output", "Explain the refund policy in detail."),
    ("clean request", "What are your opening hours?"),
    ("rate limit", "Are you still there?"),
];

/// Answers for the prompts that pass the input guardrails, in order.
fn scripted_answers() -> Vec<ChatResponse> {
    vec![
        ChatResponse::text("Use the \"Forgot password\" link on the sign-in page."),
        ChatResponse::text(
            "Refunds are available within 30 days of purchase for unused items in their \
             original packaging. Digital goods are refundable within 14 days if not \
             downloaded. Shipping costs are non-refundable except for defective items, \
             which we replace or refund in full.",
        ),
        ChatResponse::text("We are open 9am to 5pm, Monday to Friday."),
    ]
}

pub fn build_agent(model: Arc<ScriptedModel>) -> ToolkitResult<Agent> {
    let guardrails = GuardrailSet::from_toml_str(GUARDRAILS)?;
    Agent::builder("Support", Arc::new(ToolLoopEngine::new(model)))
        .instructions("You are a concise customer support assistant.")
        .input_guardrails(guardrails.input)
        .output_guardrails(guardrails.output)
        .build()
}

fn verdict(result: ToolkitResult<String>) -> ToolkitResult<Verdict> {
    match result {
        Ok(text) => Ok(Verdict::Answered(text)),
        Err(ToolkitError::GuardrailViolation {
            guardrail,
            phase,
            info,
        }) => Ok(Verdict::Rejected {
            guardrail,
            phase,
            reason: info["reason"].as_str().unwrap_or_default().to_string(),
        }),
        Err(other) => Err(other),
    }
}

/// Run every case and return the verdicts, plus how many model calls were made.
pub async fn run() -> ToolkitResult<(Vec<GuardrailCase>, usize)> {
    let model = Arc::new(ScriptedModel::new(scripted_answers()));
    let agent = build_agent(Arc::clone(&model))?;
    let ctx = RunContext::new().with_user_id(USER_ID);

    let mut cases = Vec::with_capacity(CASES.len());
    for (label, prompt) in CASES {
        let result = agent
            .generate(GenerateOptions::new(prompt).with_context(ctx.clone()))
            .await
            .map(|r| r.text);
        let verdict = verdict(result)?;

        match &verdict {
            Verdict::Answered(text) => println!("  [PASS]   {:<20} {}", label, text),
            Verdict::Rejected {
                guardrail, reason, ..
            } => println!("  [REJECT] {:<20} {} ({})", label, reason, guardrail),
        }

        cases.push(GuardrailCase {
            label,
            prompt,
            verdict,
        });
    }

    Ok((cases, model.calls()))
}

/// Run Scenario 3 and print its outcome.
pub async fn run_scenario() -> ToolkitResult<()> {
    println!("=== Scenario 3: Guardrails (input and output rejections) ===");
    println!();

    let (cases, model_calls) = run().await?;

    let rejected = cases
        .iter()
        .filter(|c| matches!(c.verdict, Verdict::Rejected { .. }))
        .count();
    println!();
    println!(
        "  {} of {} prompts rejected; the model was called {} time(s)",
        rejected,
        cases.len(),
        model_calls
    );
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}
