//! Banned-word content filter.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use agentkit_contracts::{
    error::{ToolkitError, ToolkitResult},
    guardrail::{GuardrailOutcome, GuardrailPhase},
};
use agentkit_core::{guardrail::GuardrailInput, traits::Guardrail};

/// Built-in word list used when no banned words are configured.
pub const DEFAULT_BANNED_WORDS: &[&str] = &["damn", "hell", "crap"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFilterOptions {
    pub banned_words: Vec<String>,
    pub case_sensitive: bool,
    /// Match banned words inside larger words ("hello" contains "hell").
    /// When false, only whole words match.
    pub allow_partial_matches: bool,
}

impl Default for ContentFilterOptions {
    fn default() -> Self {
        Self {
            banned_words: DEFAULT_BANNED_WORDS.iter().map(|w| w.to_string()).collect(),
            case_sensitive: false,
            allow_partial_matches: true,
        }
    }
}

struct BannedWord {
    /// As compared: lowercased unless matching is case sensitive.
    word: String,
    /// Whole-word matcher, present when partial matches are disallowed.
    whole: Option<Regex>,
}

/// Trips when the text contains any banned word.
///
/// Info: `{reason, word}` naming the first banned word found, in list order.
pub struct ContentFilter {
    name: &'static str,
    reason: &'static str,
    case_sensitive: bool,
    words: Vec<BannedWord>,
}

impl ContentFilter {
    /// Filter for user prompts (`content-filter-input`).
    pub fn input(options: ContentFilterOptions) -> ToolkitResult<Self> {
        Self::new(GuardrailPhase::Input, options)
    }

    /// Filter for generated responses (`content-filter-output`).
    pub fn output(options: ContentFilterOptions) -> ToolkitResult<Self> {
        Self::new(GuardrailPhase::Output, options)
    }

    pub fn new(phase: GuardrailPhase, options: ContentFilterOptions) -> ToolkitResult<Self> {
        let (name, reason) = match phase {
            GuardrailPhase::Input => ("content-filter-input", "Inappropriate content detected"),
            GuardrailPhase::Output => ("content-filter-output", "Inappropriate content in response"),
        };

        let words = options
            .banned_words
            .iter()
            .map(|raw| -> ToolkitResult<BannedWord> {
                let word = if options.case_sensitive {
                    raw.clone()
                } else {
                    raw.to_lowercase()
                };
                let whole = if options.allow_partial_matches {
                    None
                } else {
                    let pattern = format!(r"\b{}\b", regex::escape(&word));
                    Some(Regex::new(&pattern).map_err(|e| ToolkitError::Config {
                        reason: format!("invalid banned word '{}': {}", raw, e),
                    })?)
                };
                Ok(BannedWord { word, whole })
            })
            .collect::<ToolkitResult<Vec<_>>>()?;

        Ok(Self {
            name,
            reason,
            case_sensitive: options.case_sensitive,
            words,
        })
    }

    /// The first banned word present in `text`, if any.
    pub fn find(&self, text: &str) -> Option<&str> {
        let text = if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        };

        self.words
            .iter()
            .find(|banned| match &banned.whole {
                Some(re) => re.is_match(&text),
                None => text.contains(&banned.word),
            })
            .map(|banned| banned.word.as_str())
    }
}

#[async_trait]
impl Guardrail for ContentFilter {
    fn name(&self) -> &str {
        self.name
    }

    async fn check(&self, input: &GuardrailInput<'_>) -> ToolkitResult<GuardrailOutcome> {
        Ok(match self.find(input.text) {
            Some(word) => {
                debug!(guardrail = self.name, word, "banned word found");
                GuardrailOutcome::trip(json!({ "reason": self.reason, "word": word }))
            }
            None => GuardrailOutcome::pass(),
        })
    }
}
