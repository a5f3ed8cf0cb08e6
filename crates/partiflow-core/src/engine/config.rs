use super::source::DEFAULT_TICKS_PER_FRAME;
use crate::core::time::TimePoint;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Failed to read pipeline definition '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse pipeline definition: {0}")]
    Parse(String),

    #[error("Failed to serialize pipeline definition: {0}")]
    Serialize(String),
}

/// Options controlling how the evaluator walks a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluatorConfig {
    /// Stop at the first stage that reports an error instead of passing its
    /// output on to the remaining stages.
    pub break_on_error: bool,
}

#[derive(Default)]
pub struct EvaluatorConfigBuilder {
    break_on_error: Option<bool>,
}

impl EvaluatorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn break_on_error(mut self, enabled: bool) -> Self {
        self.break_on_error = Some(enabled);
        self
    }

    pub fn build(self) -> Result<EvaluatorConfig, ConfigError> {
        Ok(EvaluatorConfig {
            break_on_error: self.break_on_error.unwrap_or(false),
        })
    }
}

/// Serializable description of a pipeline chain.
///
/// ```toml
/// [animation]
/// ticks-per-frame = 160
///
/// [[modifiers]]
/// type = "slice"
/// normal = [0.0, 0.0, 1.0]
/// distance = 5.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PipelineConfig {
    pub animation: AnimationSettings,
    pub modifiers: Vec<ModifierSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct AnimationSettings {
    pub ticks_per_frame: TimePoint,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            ticks_per_frame: DEFAULT_TICKS_PER_FRAME,
        }
    }
}

/// One `[[modifiers]]` entry. Every key besides `type`, `enabled` and
/// `title` is a modifier parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModifierSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub params: toml::Table,
}

fn default_enabled() -> bool {
    true
}

impl ModifierSpec {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            enabled: true,
            title: None,
            params: toml::Table::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.animation.ticks_per_frame <= 0 {
            return Err(ConfigError::InvalidValue {
                name: "animation.ticks-per-frame",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
