use super::cache::StageCache;
use super::error::ModifierError;
use super::modifier::{ParameterSnapshot, SharedModifier, read_modifier};
use crate::core::status::PipelineStatus;

/// Evaluation state of one stage, as of its most recent evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageState {
    /// The cached output can be reused as long as the inputs stay the same.
    Clean,
    /// Never evaluated, or invalidated since the last evaluation.
    #[default]
    Dirty,
    Evaluating,
    /// The last evaluation reported an error; the stage is evaluated again
    /// on the next request.
    Error,
}

/// Everything a stage's output depends on besides the requested time, which
/// is checked against the cached output's validity interval instead.
#[derive(Debug, Clone, PartialEq)]
pub struct StageInputs {
    pub upstream_revision: u64,
    pub parameters: ParameterSnapshot,
}

/// The binding of a modifier to one position of a pipeline chain.
///
/// The cache belongs to the application rather than the modifier: a shared
/// modifier used at several positions gets an independent cache at each.
#[derive(Debug)]
pub struct ModifierApplication {
    modifier: SharedModifier,
    enabled: bool,
    title: Option<String>,
    pub(crate) cache: StageCache<StageInputs>,
    pub(crate) state: StageState,
    pub(crate) status: PipelineStatus,
    pub(crate) evaluation_count: u64,
    pub(crate) cache_hits: u64,
}

impl ModifierApplication {
    pub fn new(modifier: SharedModifier) -> Self {
        Self {
            modifier,
            enabled: true,
            title: None,
            cache: StageCache::new(),
            state: StageState::Dirty,
            status: PipelineStatus::success(),
            evaluation_count: 0,
            cache_hits: 0,
        }
    }

    pub fn modifier(&self) -> &SharedModifier {
        &self.modifier
    }

    pub(crate) fn set_modifier(&mut self, modifier: SharedModifier) {
        self.modifier = modifier;
        self.invalidate();
    }

    pub fn type_name(&self) -> &'static str {
        read_modifier(&self.modifier).type_name()
    }

    /// The user-assigned title, falling back to the modifier's own.
    pub fn title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => read_modifier(&self.modifier).title(),
        }
    }

    pub fn custom_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    /// Status the stage reported on its last evaluation.
    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    /// Number of times the modifier was actually invoked for this stage.
    pub fn evaluation_count(&self) -> u64 {
        self.evaluation_count
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub fn cache(&self) -> &StageCache<StageInputs> {
        &self.cache
    }

    pub(crate) fn inputs(&self, upstream_revision: u64) -> Result<StageInputs, ModifierError> {
        Ok(StageInputs {
            upstream_revision,
            parameters: read_modifier(&self.modifier).parameters()?,
        })
    }

    pub(crate) fn invalidate(&mut self) {
        self.cache.invalidate();
        self.state = StageState::Dirty;
    }
}
