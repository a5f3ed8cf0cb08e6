use thiserror::Error;

use super::config::ConfigError;
use crate::core::data::DataError;

/// Failure of a single modifier evaluation.
///
/// These never abort a pipeline walk: the evaluator turns them into an
/// error status attached to the stage's output.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModifierError {
    #[error("{0}")]
    Configuration(String),

    #[error("Modifier is not applicable to its input: {0}")]
    NotApplicable(String),

    #[error("Modifier input is empty.")]
    EmptyInput,

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Computation failed: {0}")]
    Computation(String),

    #[error("Computation was canceled.")]
    Canceled,

    #[error(transparent)]
    Data(#[from] DataError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Evaluation request was superseded by a newer request")]
    Superseded,

    #[error("Unknown modifier type '{0}'")]
    UnknownModifierType(String),

    #[error("Modifier type '{0}' is already registered")]
    DuplicateModifierType(String),

    #[error("Pipeline stage does not exist")]
    UnknownStage,

    #[error("Stage index {index} is out of range for a chain of {len} stages")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid parameters for modifier '{type_name}': {source}")]
    InvalidParameters {
        type_name: String,
        source: ModifierError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
