use crate::core::data::DataCollection;
use crate::core::status::PipelineStatus;
use crate::core::time::TimeInterval;
use std::sync::Arc;
use tracing::trace;

/// The output of one pipeline stage: a shared data collection plus the status
/// of the stage and the time interval over which the result stays valid.
///
/// Cloning a flow state shares its collection. [`mutable_data`](Self::mutable_data)
/// copies the collection first when it is referenced from anywhere else, so
/// holders of earlier clones keep seeing the unmodified data.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFlowState {
    data: Option<Arc<DataCollection>>,
    status: PipelineStatus,
    validity: TimeInterval,
}

impl Default for PipelineFlowState {
    fn default() -> Self {
        Self {
            data: None,
            status: PipelineStatus::success(),
            validity: TimeInterval::infinite(),
        }
    }
}

impl PipelineFlowState {
    pub fn new(data: DataCollection, validity: TimeInterval) -> Self {
        Self::from_shared(Arc::new(data), validity)
    }

    pub fn from_shared(data: Arc<DataCollection>, validity: TimeInterval) -> Self {
        Self {
            data: Some(data),
            status: PipelineStatus::success(),
            validity,
        }
    }

    /// A flow state without any data, valid forever.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn data(&self) -> Option<&DataCollection> {
        self.data.as_deref()
    }

    pub fn shared_data(&self) -> Option<&Arc<DataCollection>> {
        self.data.as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the collection for modification, guaranteeing that this flow
    /// state is its only owner. A state without data gets a fresh, empty
    /// collection.
    pub fn mutable_data(&mut self) -> &mut DataCollection {
        let data = self.data.get_or_insert_with(Default::default);
        if Arc::strong_count(data) > 1 {
            trace!("Cloning shared data collection before mutation.");
        }
        Arc::make_mut(data)
    }

    pub fn set_data(&mut self, data: Option<DataCollection>) {
        self.data = data.map(Arc::new);
    }

    /// Whether both flow states point to the very same collection instance.
    pub fn shares_data_with(&self, other: &PipelineFlowState) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: PipelineStatus) {
        self.status = status;
    }

    pub fn validity(&self) -> TimeInterval {
        self.validity
    }

    pub fn set_validity(&mut self, validity: TimeInterval) {
        self.validity = validity;
    }

    /// Narrows the validity interval to the part shared with `other`.
    pub fn intersect_validity(&mut self, other: &TimeInterval) {
        self.validity.intersect(other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::standard;
    use crate::core::data::{ElementKind, Property, PropertyContainer};

    fn state_with_selection(flags: &[bool]) -> PipelineFlowState {
        let mut particles = PropertyContainer::new(ElementKind::Particles, flags.len());
        particles
            .insert_property(Property::from_flags(standard::SELECTION, flags).unwrap())
            .unwrap();
        let mut collection = DataCollection::new();
        collection.add(particles.into()).unwrap();
        PipelineFlowState::new(collection, TimeInterval::infinite())
    }

    fn selection_of(state: &PipelineFlowState) -> Vec<bool> {
        state
            .data()
            .unwrap()
            .container(ElementKind::Particles)
            .unwrap()
            .property(standard::SELECTION)
            .unwrap()
            .flags()
            .unwrap()
    }

    #[test]
    fn mutable_data_on_shared_state_leaves_clone_untouched() {
        let mut a = state_with_selection(&[true, false, true]);
        let b = a.clone();
        assert!(a.shares_data_with(&b));

        let particles = a.mutable_data().container_mut("particles").unwrap();
        particles
            .property_mut(standard::SELECTION)
            .unwrap()
            .as_int_mut()
            .unwrap()[0] = 0;

        assert!(!a.shares_data_with(&b));
        assert_eq!(selection_of(&a), vec![false, false, true]);
        assert_eq!(selection_of(&b), vec![true, false, true]);
    }

    #[test]
    fn mutable_data_on_exclusive_state_does_not_clone() {
        let mut state = state_with_selection(&[true]);
        let before = Arc::as_ptr(state.shared_data().unwrap());
        state.mutable_data().set_attribute("Touched", 1_i64);
        let after = Arc::as_ptr(state.shared_data().unwrap());
        assert_eq!(before, after);
        assert_eq!(Arc::strong_count(state.shared_data().unwrap()), 1);
    }

    #[test]
    fn mutable_data_creates_collection_for_empty_state() {
        let mut state = PipelineFlowState::empty();
        assert!(!state.has_data());
        state.mutable_data().set_attribute("A", 1_i64);
        assert!(state.has_data());
    }

    #[test]
    fn intersect_validity_narrows_interval() {
        let mut state = PipelineFlowState::empty();
        state.intersect_validity(&TimeInterval::new(0, 100));
        state.intersect_validity(&TimeInterval::new(50, 200));
        assert_eq!(state.validity(), TimeInterval::new(50, 100));
    }
}
