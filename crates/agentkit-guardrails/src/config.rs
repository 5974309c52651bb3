//! TOML guardrail configuration.
//!
//! A `GuardrailConfig` holds two ordered lists, `input` and `output`. Order in
//! the file is the order the pipeline runs them.
//!
//! ```toml
//! [[input]]
//! kind = "rate-limiter"
//! max_requests = 10
//! window_ms = 60000
//!
//! [[input]]
//! kind = "content-filter"
//! banned_words = ["spam"]
//!
//! [[output]]
//! kind = "length-validator"
//! max = 500
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use agentkit_contracts::{
    error::{ToolkitError, ToolkitResult},
    guardrail::GuardrailPhase,
};
use agentkit_core::traits::Guardrail;

use crate::{
    content_filter::{ContentFilter, ContentFilterOptions},
    length::LengthValidator,
    pii::{PiiDetector, PiiType},
    rate_limiter::{RateLimitGuardrail, RateLimiter},
};

/// One configured guardrail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GuardrailSpec {
    ContentFilter {
        #[serde(default)]
        banned_words: Option<Vec<String>>,
        #[serde(default)]
        case_sensitive: bool,
        #[serde(default = "default_true")]
        allow_partial_matches: bool,
    },
    PiiDetector {
        /// Empty or absent means every type.
        #[serde(default)]
        types: Vec<PiiType>,
    },
    LengthValidator {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    /// Only valid in the `input` list.
    RateLimiter { max_requests: usize, window_ms: u64 },
}

fn default_true() -> bool {
    true
}

/// The top-level structure deserialized from a TOML guardrail file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardrailConfig {
    #[serde(default)]
    pub input: Vec<GuardrailSpec>,
    #[serde(default)]
    pub output: Vec<GuardrailSpec>,
}

/// Built, ordered guardrail lists ready to hand to an agent builder.
#[derive(Default, Clone)]
pub struct GuardrailSet {
    pub input: Vec<Arc<dyn Guardrail>>,
    pub output: Vec<Arc<dyn Guardrail>>,
}

impl GuardrailSet {
    /// Parse `s` as TOML and build every configured guardrail.
    ///
    /// Returns `ToolkitError::Config` if the TOML is malformed or any entry
    /// is invalid for its list.
    pub fn from_toml_str(s: &str) -> ToolkitResult<Self> {
        let config: GuardrailConfig = toml::from_str(s).map_err(|e| ToolkitError::Config {
            reason: format!("failed to parse guardrail TOML: {}", e),
        })?;
        Self::from_config(&config)
    }

    pub fn from_file(path: &Path) -> ToolkitResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ToolkitError::Config {
            reason: format!("failed to read guardrail file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_config(config: &GuardrailConfig) -> ToolkitResult<Self> {
        let input = config
            .input
            .iter()
            .map(|spec| build(spec, GuardrailPhase::Input))
            .collect::<ToolkitResult<Vec<_>>>()?;
        let output = config
            .output
            .iter()
            .map(|spec| build(spec, GuardrailPhase::Output))
            .collect::<ToolkitResult<Vec<_>>>()?;

        debug!(
            input = input.len(),
            output = output.len(),
            "guardrail set loaded"
        );
        Ok(Self { input, output })
    }

    /// Names of the built guardrails, input list then output list.
    pub fn names(&self) -> Vec<String> {
        self.input
            .iter()
            .chain(self.output.iter())
            .map(|g| g.name().to_string())
            .collect()
    }
}

fn build(spec: &GuardrailSpec, phase: GuardrailPhase) -> ToolkitResult<Arc<dyn Guardrail>> {
    let guardrail: Arc<dyn Guardrail> = match spec {
        GuardrailSpec::ContentFilter {
            banned_words,
            case_sensitive,
            allow_partial_matches,
        } => {
            let mut options = ContentFilterOptions {
                case_sensitive: *case_sensitive,
                allow_partial_matches: *allow_partial_matches,
                ..Default::default()
            };
            if let Some(words) = banned_words {
                options.banned_words = words.clone();
            }
            Arc::new(ContentFilter::new(phase, options)?)
        }
        GuardrailSpec::PiiDetector { types } => Arc::new(PiiDetector::new(phase, types)?),
        GuardrailSpec::LengthValidator { min, max } => {
            Arc::new(LengthValidator::new(phase, *min, *max)?)
        }
        GuardrailSpec::RateLimiter {
            max_requests,
            window_ms,
        } => {
            if phase == GuardrailPhase::Output {
                return Err(ToolkitError::Config {
                    reason: "rate-limiter can only be configured as an input guardrail".to_string(),
                });
            }
            let limiter = RateLimiter::new(*max_requests, Duration::from_millis(*window_ms))?;
            Arc::new(RateLimitGuardrail::new(Arc::new(limiter)))
        }
    };
    Ok(guardrail)
}
