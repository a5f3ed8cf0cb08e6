use crate::core::data::standard;
use crate::core::data::{DataCollection, DataObjectType, ElementKind};
use crate::core::status::PipelineStatus;
use crate::engine::delegate::{DelegateRegistry, ModifierDelegate};
use crate::engine::error::ModifierError;
use crate::engine::flow_state::PipelineFlowState;
use crate::engine::modifier::{EvaluationRequest, Modifier, ParameterSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ClearSelectionParams {
    pub operate_on: Option<ElementKind>,
}

#[derive(Debug)]
struct ClearSelectionDelegate(ElementKind);

impl ModifierDelegate<ClearSelectionParams> for ClearSelectionDelegate {
    fn object_type(&self) -> DataObjectType {
        DataObjectType::Elements(self.0)
    }

    fn apply(
        &self,
        _params: &ClearSelectionParams,
        state: &mut PipelineFlowState,
        object_id: &str,
    ) -> Result<PipelineStatus, ModifierError> {
        let has_selection = state
            .data()
            .and_then(|data| data.container_by_id(object_id))
            .is_some_and(|c| c.contains_property(standard::SELECTION));
        // Nothing to clear: leave the (possibly shared) data alone.
        if !has_selection {
            return Ok(PipelineStatus::success());
        }
        if let Some(container) = state.mutable_data().container_mut(object_id) {
            container.remove_property(standard::SELECTION);
        }
        Ok(PipelineStatus::success())
    }
}

/// Removes the `Selection` property from all containers of the chosen kind.
#[derive(Debug)]
pub struct ClearSelectionModifier {
    params: ClearSelectionParams,
    delegates: DelegateRegistry<ClearSelectionParams>,
}

impl Default for ClearSelectionModifier {
    fn default() -> Self {
        Self::new(Some(ElementKind::Particles))
    }
}

impl ClearSelectionModifier {
    pub const TYPE_NAME: &'static str = "clear-selection";

    pub fn new(operate_on: Option<ElementKind>) -> Self {
        let mut delegates: DelegateRegistry<ClearSelectionParams> = DelegateRegistry::new();
        for kind in ElementKind::ALL {
            delegates.register(Arc::new(ClearSelectionDelegate(kind)));
        }
        Self {
            params: ClearSelectionParams { operate_on },
            delegates,
        }
    }
}

impl Modifier for ClearSelectionModifier {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn title(&self) -> String {
        "Clear selection".to_string()
    }

    fn parameters(&self) -> Result<ParameterSnapshot, ModifierError> {
        ParameterSnapshot::capture(&self.params)
    }

    fn set_parameters(&mut self, params: &ParameterSnapshot) -> Result<(), ModifierError> {
        self.params = params.restore()?;
        Ok(())
    }

    fn is_applicable_to(&self, input: &DataCollection) -> bool {
        self.delegates.any_applicable(input)
    }

    fn evaluate_preliminary(
        &self,
        _request: &EvaluationRequest,
        state: &mut PipelineFlowState,
    ) -> Result<(), ModifierError> {
        self.delegates.apply(self.params.operate_on, &self.params, state)
    }
}
