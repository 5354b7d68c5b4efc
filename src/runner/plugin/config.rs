//! Engine configuration file parsing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Cranelift optimization level for generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    None,
    #[default]
    Speed,
}

impl OptLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
        }
    }
}

/// Engine configuration.
///
/// Expected format:
/// ```toml
/// max_call_depth = 400
/// opt_level = "speed"
/// drain_jobs = true
/// log_level = "info"
/// disabled_builtins = ["Promise"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nested script calls allowed before a `RangeError`.
    pub max_call_depth: u32,
    pub opt_level: OptLevel,
    /// Run queued promise jobs before `evaluate` returns.
    pub drain_jobs: bool,
    /// Only read by the command line front end.
    pub log_level: String,
    /// Registry objects left out of new realms.
    pub disabled_builtins: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_call_depth: 400,
            opt_level: OptLevel::Speed,
            drain_jobs: true,
            log_level: "warn".to_string(),
            disabled_builtins: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::ValidationError(
                "max_call_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_parse_config() {
        let content = r#"
max_call_depth = 64
opt_level = "none"
drain_jobs = false
disabled_builtins = ["Promise"]
"#;
        let config = EngineConfig::parse(content).unwrap();
        assert_eq!(config.max_call_depth, 64);
        assert_eq!(config.opt_level, OptLevel::None);
        assert!(!config.drain_jobs);
        assert_eq!(config.disabled_builtins, vec!["Promise".to_string()]);
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        assert!(matches!(
            EngineConfig::parse("max_call_depth = 0"),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_opt_level_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::parse("opt_level = \"fastest\""),
            Err(ConfigError::ParseError(_))
        ));
    }
}
