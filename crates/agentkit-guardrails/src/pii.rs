//! Personally identifiable information detection.

use std::fmt;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use agentkit_contracts::{
    error::{ToolkitError, ToolkitResult},
    guardrail::{GuardrailOutcome, GuardrailPhase},
};
use agentkit_core::{guardrail::GuardrailInput, traits::Guardrail};

/// A category of PII the detector can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PiiType {
    Ssn,
    Email,
    Phone,
    CreditCard,
    IpAddress,
}

impl PiiType {
    pub const ALL: [PiiType; 5] = [
        PiiType::Ssn,
        PiiType::Email,
        PiiType::Phone,
        PiiType::CreditCard,
        PiiType::IpAddress,
    ];

    fn pattern(self) -> &'static str {
        match self {
            Self::Ssn => r"\b\d{3}-\d{2}-\d{4}\b",
            Self::Email => r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            Self::Phone => r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b",
            Self::CreditCard => r"\b\d{4}[- ]?\d{4}[- ]?\d{4}[- ]?\d{4}\b",
            Self::IpAddress => r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
        }
    }
}

impl fmt::Display for PiiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ssn => "ssn",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::CreditCard => "credit-card",
            Self::IpAddress => "ip-address",
        };
        f.write_str(s)
    }
}

/// Trips when the text contains any configured PII type.
///
/// Info: `{reason, types}` listing every detected type in configuration order.
pub struct PiiDetector {
    name: &'static str,
    reason: &'static str,
    patterns: Vec<(PiiType, Regex)>,
}

impl PiiDetector {
    /// Detector for user prompts (`pii-detector-input`).
    pub fn input(types: &[PiiType]) -> ToolkitResult<Self> {
        Self::new(GuardrailPhase::Input, types)
    }

    /// Detector for generated responses (`pii-detector-output`).
    pub fn output(types: &[PiiType]) -> ToolkitResult<Self> {
        Self::new(GuardrailPhase::Output, types)
    }

    /// An empty `types` slice checks every known type.
    pub fn new(phase: GuardrailPhase, types: &[PiiType]) -> ToolkitResult<Self> {
        let (name, reason) = match phase {
            GuardrailPhase::Input => ("pii-detector-input", "PII detected in input"),
            GuardrailPhase::Output => ("pii-detector-output", "PII detected in response"),
        };
        let types = if types.is_empty() {
            &PiiType::ALL[..]
        } else {
            types
        };

        let patterns = types
            .iter()
            .map(|&ty| {
                Regex::new(ty.pattern())
                    .map(|re| (ty, re))
                    .map_err(|e| ToolkitError::Config {
                        reason: format!("invalid {} pattern: {}", ty, e),
                    })
            })
            .collect::<ToolkitResult<Vec<_>>>()?;

        Ok(Self {
            name,
            reason,
            patterns,
        })
    }

    /// Every configured type found in `text`.
    pub fn detect(&self, text: &str) -> Vec<PiiType> {
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(ty, _)| *ty)
            .collect()
    }
}

#[async_trait]
impl Guardrail for PiiDetector {
    fn name(&self) -> &str {
        self.name
    }

    async fn check(&self, input: &GuardrailInput<'_>) -> ToolkitResult<GuardrailOutcome> {
        let found = self.detect(input.text);
        if found.is_empty() {
            return Ok(GuardrailOutcome::pass());
        }
        Ok(GuardrailOutcome::trip(json!({
            "reason": self.reason,
            "types": found,
        })))
    }
}
