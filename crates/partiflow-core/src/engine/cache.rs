use super::flow_state::PipelineFlowState;
use crate::core::time::TimePoint;

/// Remembers the input state of the most recent evaluation and reports
/// whether a new input state differs from it.
///
/// Comparison is by value, so two unrelated input snapshots that compare
/// equal are treated as the same input. A fresh helper has no stored state
/// and reports every first input as changed.
#[derive(Debug, Clone)]
pub struct CacheStateHelper<T> {
    state: Option<T>,
}

impl<T> Default for CacheStateHelper<T> {
    fn default() -> Self {
        Self { state: None }
    }
}

impl<T: PartialEq> CacheStateHelper<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `state` and returns whether it differs from the previously
    /// stored state. The stored state is replaced in every case.
    pub fn update_state(&mut self, state: T) -> bool {
        let changed = self.has_changed(&state);
        self.state = Some(state);
        changed
    }

    /// Like [`update_state`](Self::update_state) but leaves the stored state alone.
    pub fn has_changed(&self, state: &T) -> bool {
        self.state.as_ref() != Some(state)
    }

    pub fn state(&self) -> Option<&T> {
        self.state.as_ref()
    }

    /// Forgets the stored state so that the next input counts as changed.
    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// Single-entry output cache of one pipeline stage.
///
/// An entry is served only while the input key is unchanged and the cached
/// output's validity interval contains the requested time.
#[derive(Debug, Clone)]
pub struct StageCache<K> {
    inputs: CacheStateHelper<K>,
    output: Option<PipelineFlowState>,
    revision: u64,
}

impl<K> Default for StageCache<K> {
    fn default() -> Self {
        Self {
            inputs: CacheStateHelper::default(),
            output: None,
            revision: 0,
        }
    }
}

impl<K: PartialEq> StageCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` as the current input and returns the cached output if it
    /// can be reused for `time`.
    ///
    /// On a miss the stale output is dropped right away, so an evaluation
    /// that never completes cannot leave an entry behind that later matches
    /// the new key.
    pub fn lookup(&mut self, key: K, time: TimePoint) -> Option<&PipelineFlowState> {
        let changed = self.inputs.update_state(key);
        let valid = self
            .output
            .as_ref()
            .is_some_and(|output| output.validity().contains(time));
        if !changed && valid {
            return self.output.as_ref();
        }
        self.output = None;
        None
    }

    /// Non-destructive variant of [`lookup`](Self::lookup).
    pub fn peek(&self, key: &K, time: TimePoint) -> Option<&PipelineFlowState> {
        if self.inputs.has_changed(key) {
            return None;
        }
        self.output
            .as_ref()
            .filter(|output| output.validity().contains(time))
    }

    /// Stores a freshly computed output under the key passed to the last
    /// [`lookup`](Self::lookup).
    ///
    /// An output carrying an error status is kept for inspection, but the
    /// recorded input is forgotten so the stage is evaluated again next time.
    pub fn store(&mut self, output: PipelineFlowState, revision: u64) {
        if output.status().is_error() {
            self.inputs.reset();
        }
        self.output = Some(output);
        self.revision = revision;
    }

    pub fn invalidate(&mut self) {
        self.inputs.reset();
        self.output = None;
    }

    pub fn output(&self) -> Option<&PipelineFlowState> {
        self.output.as_ref()
    }

    /// Revision number of the cached output.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
