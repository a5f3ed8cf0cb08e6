use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a pipeline status. The derived ordering ranks severity:
/// `Success < Warning < Error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StatusKind {
    #[default]
    Success,
    Warning,
    Error,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusKind::Success => "success",
            StatusKind::Warning => "warning",
            StatusKind::Error => "error",
        };
        f.write_str(label)
    }
}

/// Human-readable health of a pipeline result: a severity plus an optional message.
///
/// Statuses are plain values attached to flow states. A failing stage never
/// aborts evaluation; it produces a status of kind [`StatusKind::Error`] that
/// downstream consumers inspect.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineStatus {
    kind: StatusKind,
    text: String,
}

impl PipelineStatus {
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn success() -> Self {
        Self::default()
    }

    pub fn success_with(text: impl Into<String>) -> Self {
        Self::new(StatusKind::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(StatusKind::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(StatusKind::Error, text)
    }

    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }

    /// Folds `other` into this status, keeping the more severe of the two.
    ///
    /// When both statuses have the same severity their messages are joined
    /// line by line, so that several warnings along a chain all stay visible.
    pub fn escalate(&mut self, other: &PipelineStatus) {
        if other.kind > self.kind {
            *self = other.clone();
        } else if other.kind == self.kind && !other.text.is_empty() {
            if self.text.is_empty() {
                self.text = other.text.clone();
            } else if self.text != other.text {
                self.text.push('\n');
                self.text.push_str(&other.text);
            }
        }
    }

    /// Merges the status reported by a sub-handler into this one.
    ///
    /// The severity only changes when this status is still a success or the
    /// other one is an error; messages are always appended.
    pub fn merge(&mut self, other: &PipelineStatus) {
        if self.kind == StatusKind::Success || other.kind == StatusKind::Error {
            self.kind = other.kind;
        }
        if !other.text.is_empty() {
            if !self.text.is_empty() {
                self.text.push('\n');
            }
            self.text.push_str(&other.text);
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.text)
        }
    }
}
