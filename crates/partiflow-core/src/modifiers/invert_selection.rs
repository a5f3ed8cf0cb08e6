use crate::core::data::standard;
use crate::core::data::{DataCollection, DataError, DataObjectType, ElementKind};
use crate::core::status::PipelineStatus;
use crate::engine::delegate::{DelegateRegistry, ModifierDelegate};
use crate::engine::error::ModifierError;
use crate::engine::flow_state::PipelineFlowState;
use crate::engine::modifier::{EvaluationRequest, Modifier, ParameterSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InvertSelectionParams {
    pub operate_on: Option<ElementKind>,
}

#[derive(Debug)]
struct InvertSelectionDelegate(ElementKind);

impl ModifierDelegate<InvertSelectionParams> for InvertSelectionDelegate {
    fn object_type(&self) -> DataObjectType {
        DataObjectType::Elements(self.0)
    }

    fn apply(
        &self,
        _params: &InvertSelectionParams,
        state: &mut PipelineFlowState,
        object_id: &str,
    ) -> Result<PipelineStatus, ModifierError> {
        let container = state
            .mutable_data()
            .container_mut(object_id)
            .ok_or_else(|| DataError::ObjectNotFound(object_id.to_string()))?;
        let selection = container.standard_property_mut(standard::SELECTION)?;
        if let Some(values) = selection.as_int_mut() {
            for value in values {
                *value = i64::from(*value == 0);
            }
        }
        Ok(PipelineStatus::success())
    }
}

/// Flips the `Selection` property of all containers of the chosen kind.
/// Containers without a selection end up with every element selected.
#[derive(Debug)]
pub struct InvertSelectionModifier {
    params: InvertSelectionParams,
    delegates: DelegateRegistry<InvertSelectionParams>,
}

impl Default for InvertSelectionModifier {
    fn default() -> Self {
        Self::new(Some(ElementKind::Particles))
    }
}

impl InvertSelectionModifier {
    pub const TYPE_NAME: &'static str = "invert-selection";

    pub fn new(operate_on: Option<ElementKind>) -> Self {
        let mut delegates: DelegateRegistry<InvertSelectionParams> = DelegateRegistry::new();
        for kind in ElementKind::ALL {
            delegates.register(Arc::new(InvertSelectionDelegate(kind)));
        }
        Self {
            params: InvertSelectionParams { operate_on },
            delegates,
        }
    }
}

impl Modifier for InvertSelectionModifier {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn title(&self) -> String {
        "Invert selection".to_string()
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
