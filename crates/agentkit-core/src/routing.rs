//! Routing predicates: which agent should handle a message.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use agentkit_contracts::error::{ToolkitError, ToolkitResult};

use crate::agent::Agent;

/// A single routing pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Case-insensitive substring match.
    Keyword(String),
    Regex(Regex),
}

impl Pattern {
    pub fn keyword(word: impl Into<String>) -> Self {
        Self::Keyword(word.into())
    }

    pub fn regex(pattern: &str) -> ToolkitResult<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| ToolkitError::Config {
                reason: format!("invalid routing pattern \"{pattern}\": {e}"),
            })
    }

    pub fn is_match(&self, message: &str) -> bool {
        match self {
            Self::Keyword(word) => message.to_lowercase().contains(&word.to_lowercase()),
            Self::Regex(re) => re.is_match(message),
        }
    }
}

type PredicateFn = dyn Fn(&str) -> bool + Send + Sync;

/// When an agent claims a message.
#[derive(Clone)]
pub enum MatchOn {
    /// Any pattern matching is enough.
    Patterns(Vec<Pattern>),
    Predicate(Arc<PredicateFn>),
}

impl MatchOn {
    /// Match on any of `words`.
    pub fn keywords<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Patterns(words.into_iter().map(Pattern::keyword).collect())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    pub fn is_match(&self, message: &str) -> bool {
        match self {
            Self::Patterns(patterns) => patterns.iter().any(|p| p.is_match(message)),
            Self::Predicate(f) => f(message),
        }
    }
}

impl fmt::Debug for MatchOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patterns(patterns) => f.debug_tuple("Patterns").field(patterns).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// The first agent in `agents` whose routing predicate matches `message`.
pub fn route<'a>(agents: &'a [Arc<Agent>], message: &str) -> Option<&'a Arc<Agent>> {
    agents.iter().find(|agent| agent.matches(message))
}
