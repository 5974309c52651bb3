//! Agent settings, loadable from TOML.
//!
//! ```toml
//! max_turns = 5
//! temperature = 0.2
//! last_messages = 20
//! max_handoff_depth = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use agentkit_contracts::error::{ToolkitError, ToolkitResult};

pub const DEFAULT_MAX_TURNS: u32 = 10;
pub const DEFAULT_MAX_HANDOFF_DEPTH: u32 = 4;

/// Per-agent limits and model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSettings {
    /// Ceiling on reasoning rounds per turn. Must be at least 1.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Keep only this many of the most recent history messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_messages: Option<usize>,
    /// How many chained handoffs a turn started on this agent may take.
    #[serde(default = "default_max_handoff_depth")]
    pub max_handoff_depth: u32,
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

fn default_max_handoff_depth() -> u32 {
    DEFAULT_MAX_HANDOFF_DEPTH
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            temperature: None,
            last_messages: None,
            max_handoff_depth: DEFAULT_MAX_HANDOFF_DEPTH,
        }
    }
}

impl AgentSettings {
    /// Parse and validate settings from a TOML document.
    pub fn from_toml_str(s: &str) -> ToolkitResult<Self> {
        let settings: Self = toml::from_str(s).map_err(|e| ToolkitError::Config {
            reason: format!("failed to parse agent settings TOML: {}", e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> ToolkitResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ToolkitError::Config {
            reason: format!("failed to read agent settings '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> ToolkitResult<()> {
        if self.max_turns == 0 {
            return Err(ToolkitError::Config {
                reason: "max_turns must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let settings = AgentSettings::from_toml_str("").unwrap();
        assert_eq!(settings, AgentSettings::default());
        assert_eq!(settings.max_turns, 10);
        assert_eq!(settings.max_handoff_depth, 4);
    }

    #[test]
    fn parses_all_fields() {
        let settings = AgentSettings::from_toml_str(
            r#"
            max_turns = 3
            temperature = 0.5
            last_messages = 20
            max_handoff_depth = 1
            "#,
        )
        .unwrap();

        assert_eq!(settings.max_turns, 3);
        assert_eq!(settings.temperature, Some(0.5));
        assert_eq!(settings.last_messages, Some(20));
        assert_eq!(settings.max_handoff_depth, 1);
    }

    #[test]
    fn zero_max_turns_is_rejected() {
        let err = AgentSettings::from_toml_str("max_turns = 0").unwrap_err();
        assert!(err.to_string().contains("max_turns"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = AgentSettings::from_toml_str("max_tunrs = 3").unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = AgentSettings::from_file(Path::new("/nonexistent/agent.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
