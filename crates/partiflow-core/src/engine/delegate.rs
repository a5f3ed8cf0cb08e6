//! Per-data-type handlers for modifiers that work on several kinds of data.
//!
//! A delegating modifier owns a [`DelegateRegistry`] and an `operate_on`
//! parameter naming the element kind it should process. Evaluation looks up
//! the delegate registered for that kind and applies it to every matching
//! container of the input.

use super::error::ModifierError;
use super::flow_state::PipelineFlowState;
use crate::core::data::{DataCollection, DataObjectType, ElementKind};
use crate::core::status::PipelineStatus;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub trait ModifierDelegate<P>: Send + Sync + fmt::Debug {
    fn object_type(&self) -> DataObjectType;

    fn is_applicable_to(&self, input: &DataCollection) -> bool {
        input.objects_of_type(self.object_type()).next().is_some()
    }

    /// Processes the data object `object_id` of the state's collection.
    fn apply(
        &self,
        params: &P,
        state: &mut PipelineFlowState,
        object_id: &str,
    ) -> Result<PipelineStatus, ModifierError>;
}

#[derive(Debug)]
pub struct DelegateRegistry<P> {
    delegates: BTreeMap<DataObjectType, Arc<dyn ModifierDelegate<P>>>,
}

impl<P> Default for DelegateRegistry<P> {
    fn default() -> Self {
        Self {
            delegates: BTreeMap::new(),
        }
    }
}

impl<P> DelegateRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `delegate` for its object type, replacing any earlier one.
    pub fn register(&mut self, delegate: Arc<dyn ModifierDelegate<P>>) {
        self.delegates.insert(delegate.object_type(), delegate);
    }

    pub fn with(mut self, delegate: Arc<dyn ModifierDelegate<P>>) -> Self {
        self.register(delegate);
        self
    }

    pub fn get(&self, object_type: DataObjectType) -> Option<&Arc<dyn ModifierDelegate<P>>> {
        self.delegates.get(&object_type)
    }

    pub fn object_types(&self) -> impl Iterator<Item = DataObjectType> + '_ {
        self.delegates.keys().copied()
    }

    /// Whether any registered delegate can process something in `input`.
    pub fn any_applicable(&self, input: &DataCollection) -> bool {
        self.delegates.values().any(|d| d.is_applicable_to(input))
    }

    /// Dispatches to the delegate for `operate_on` and runs it on every
    /// container of that kind, merging the statuses the delegate reports into
    /// the state's status.
    pub fn apply(
        &self,
        operate_on: Option<ElementKind>,
        params: &P,
        state: &mut PipelineFlowState,
    ) -> Result<(), ModifierError> {
        let kind = operate_on.ok_or_else(|| {
            ModifierError::Configuration("No input element type selected.".to_string())
        })?;
        let object_type = DataObjectType::Elements(kind);
        let delegate = self.get(object_type).ok_or_else(|| {
            ModifierError::Configuration(format!("Modifier cannot operate on {}.", kind))
        })?;

        let input = state.data().ok_or(ModifierError::EmptyInput)?;
        if !delegate.is_applicable_to(input) {
            return Err(ModifierError::NotApplicable(format!(
                "The input does not contain any {}.",
                kind
            )));
        }
        let targets = input.identifiers_of_type(object_type);

        let mut status = state.status().clone();
        for object_id in &targets {
            let reported = delegate.apply(params, state, object_id)?;
            status.merge(&reported);
        }
        state.set_status(status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::PropertyContainer;
    use crate::core::time::TimeInterval;

    #[derive(Debug)]
    struct CountingDelegate(ElementKind);

    impl ModifierDelegate<()> for CountingDelegate {
        fn object_type(&self) -> DataObjectType {
            DataObjectType::Elements(self.0)
        }

        fn apply(
            &self,
            _params: &(),
            state: &mut PipelineFlowState,
            object_id: &str,
        ) -> Result<PipelineStatus, ModifierError> {
            state.mutable_data().set_attribute(&format!("Visited.{}", object_id), 1_i64);
            Ok(PipelineStatus::success_with(format!("visited {}", object_id)))
        }
    }

    fn registry() -> DelegateRegistry<()> {
        DelegateRegistry::new().with(Arc::new(CountingDelegate(ElementKind::Particles)))
    }

    fn state_with_two_particle_containers() -> PipelineFlowState {
        let mut collection = DataCollection::new();
        collection
            .add(PropertyContainer::new(ElementKind::Particles, 1).into())
            .unwrap();
        collection
            .add(PropertyContainer::with_identifier("particles.2", ElementKind::Particles, 1).into())
            .unwrap();
        PipelineFlowState::new(collection, TimeInterval::infinite())
    }

    #[test]
    fn missing_operate_on_is_a_configuration_error() {
        let mut state = state_with_two_particle_containers();
        let err = registry().apply(None, &(), &mut state).unwrap_err();
        assert_eq!(
            err,
            ModifierError::Configuration("No input element type selected.".to_string())
        );
    }

    #[test]
    fn unregistered_kind_is_rejected() {
        let mut state = state_with_two_particle_containers();
        let err = registry()
            .apply(Some(ElementKind::Bonds), &(), &mut state)
            .unwrap_err();
        assert!(matches!(err, ModifierError::Configuration(_)));
    }

    #[test]
    fn delegate_runs_on_every_matching_container() {
        let mut state = state_with_two_particle_containers();
        registry()
            .apply(Some(ElementKind::Particles), &(), &mut state)
            .unwrap();
        let data = state.data().unwrap();
        assert!(data.attribute("Visited.particles").is_some());
        assert!(data.attribute("Visited.particles.2").is_some());
        assert_eq!(state.status().text(), "visited particles\nvisited particles.2");
    }

    #[test]
    fn input_without_matching_container_is_not_applicable() {
        let mut state = PipelineFlowState::new(DataCollection::new(), TimeInterval::infinite());
        let err = registry()
            .apply(Some(ElementKind::Particles), &(), &mut state)
            .unwrap_err();
        assert!(matches!(err, ModifierError::NotApplicable(_)));
    }
}
