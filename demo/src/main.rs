//! agentkit demo CLI
//!
//! Runs one or all of the reference scenarios. Each scenario uses real
//! agentkit components (agents, tool cache, working memory, guardrails,
//! event log) wired to deterministic mock models.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- basic
//!   cargo run -p demo -- multi-agent
//!   cargo run -p demo -- guardrails

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use agentkit_contracts::error::ToolkitResult;
use agentkit_scenarios::scenarios::{basic, guardrails, multi_agent};

// ── CLI definition ────────────────────────────────────────────────────────────

/// agentkit: agents, tools, handoffs, and guardrails.
///
/// Each subcommand runs one or all of the reference scenarios.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "agentkit reference scenarios demo",
    long_about = "Runs agentkit reference scenarios showing tool caching, working memory,\n\
                  multi-agent handoffs, guardrail rejections, and event log integrity."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: Weather assistant (tool cache + working memory).
    Basic,
    /// Scenario 2: Orchestrator handing off to Weather / News / Math specialists.
    MultiAgent,
    /// Scenario 3: Input and output guardrail rejections.
    Guardrails,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all().await,
        Command::Basic => basic::run_scenario().await,
        Command::MultiAgent => multi_agent::run_scenario().await,
        Command::Guardrails => guardrails::run_scenario().await,
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error ({}): {}", e.kind(), e);
            std::process::exit(1);
        }
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

async fn run_all() -> ToolkitResult<()> {
    basic::run_scenario().await?;
    multi_agent::run_scenario().await?;
    guardrails::run_scenario().await?;
    debug!("all scenarios finished");
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("agentkit Reference Demo");
    println!("=======================");
    println!();
    println!("Turn pipeline per generate():");
    println!("  [1] Input guardrails run in order; the first trip rejects the turn");
    println!("  [2] Instructions and tools resolved for the run context");
    println!("  [3] Reasoning engine loops model calls and tool calls (bounded rounds)");
    println!("  [4] A handoff instruction delegates the turn to a specialist agent");
    println!("  [5] Output guardrails run on the final text, then agent-end is emitted");
    println!();
}
