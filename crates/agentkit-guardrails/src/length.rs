//! Character-length bounds.

use async_trait::async_trait;
use serde_json::json;

use agentkit_contracts::{
    error::{ToolkitError, ToolkitResult},
    guardrail::{GuardrailOutcome, GuardrailPhase},
};
use agentkit_core::{guardrail::GuardrailInput, traits::Guardrail};

/// Trips when the text is shorter than `min` or longer than `max` characters.
///
/// Length is counted in Unicode scalar values. Info is
/// `{reason, length, minimum}` or `{reason, length, maximum}`.
#[derive(Debug, Clone)]
pub struct LengthValidator {
    phase: GuardrailPhase,
    min: Option<usize>,
    max: Option<usize>,
}

impl LengthValidator {
    /// Validator for user prompts (`length-validator-input`).
    pub fn input(min: Option<usize>, max: Option<usize>) -> ToolkitResult<Self> {
        Self::new(GuardrailPhase::Input, min, max)
    }

    /// Validator for generated responses (`length-validator-output`).
    pub fn output(min: Option<usize>, max: Option<usize>) -> ToolkitResult<Self> {
        Self::new(GuardrailPhase::Output, min, max)
    }

    pub fn new(phase: GuardrailPhase, min: Option<usize>, max: Option<usize>) -> ToolkitResult<Self> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ToolkitError::Config {
                    reason: format!("length bounds are inverted: min {} > max {}", min, max),
                });
            }
        }
        Ok(Self { phase, min, max })
    }

    fn label(&self) -> &'static str {
        match self.phase {
            GuardrailPhase::Input => "Input",
            GuardrailPhase::Output => "Output",
        }
    }
}

#[async_trait]
impl Guardrail for LengthValidator {
    fn name(&self) -> &str {
        match self.phase {
            GuardrailPhase::Input => "length-validator-input",
            GuardrailPhase::Output => "length-validator-output",
        }
    }

    async fn check(&self, input: &GuardrailInput<'_>) -> ToolkitResult<GuardrailOutcome> {
        let length = input.text.chars().count();

        if let Some(min) = self.min {
            if length < min {
                return Ok(GuardrailOutcome::trip(json!({
                    "reason": format!("{} too short", self.label()),
                    "length": length,
                    "minimum": min,
                })));
            }
        }

        if let Some(max) = self.max {
            if length > max {
                return Ok(GuardrailOutcome::trip(json!({
                    "reason": format!("{} too long", self.label()),
                    "length": length,
                    "maximum": max,
                })));
            }
        }

        Ok(GuardrailOutcome::pass())
    }
}
