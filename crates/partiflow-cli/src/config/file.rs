use crate::error::{CliError, Result};
use partiflow::core::time::TimePoint;
use partiflow::engine::config::ModifierSpec;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// The pipeline file as written by the user. It extends the core pipeline
/// definition with an `[evaluation]` table; every setting is optional so
/// command-line values and defaults can fill the gaps.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub evaluation: Option<FileEvaluationConfig>,
    pub animation: Option<FileAnimationConfig>,
    #[serde(default)]
    pub modifiers: Vec<ModifierSpec>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEvaluationConfig {
    pub break_on_error: Option<bool>,
    pub frames: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileAnimationConfig {
    pub ticks_per_frame: Option<TimePoint>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading pipeline file from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read pipeline file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| CliError::Config(format!("Failed to parse pipeline file {:?}: {}", path, e)))
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
