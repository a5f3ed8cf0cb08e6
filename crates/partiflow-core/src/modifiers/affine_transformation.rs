use crate::core::data::standard;
use crate::core::data::{DataCollection, DataError, DataObjectType, ElementKind};
use crate::core::status::PipelineStatus;
use crate::engine::delegate::{DelegateRegistry, ModifierDelegate};
use crate::engine::error::ModifierError;
use crate::engine::flow_state::PipelineFlowState;
use crate::engine::modifier::{EvaluationRequest, Modifier, ParameterSnapshot};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Row-major 3x4 matrix: the left 3x3 block is the linear part, the last
/// column the translation.
pub type AffineMatrix = [[f64; 4]; 3];

pub const IDENTITY: AffineMatrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AffineTransformationParams {
    pub operate_on: Option<ElementKind>,
    pub transformation: AffineMatrix,
    pub only_selected: bool,
}

impl Default for AffineTransformationParams {
    fn default() -> Self {
        Self {
            operate_on: Some(ElementKind::Particles),
            transformation: IDENTITY,
            only_selected: false,
        }
    }
}

impl AffineTransformationParams {
    fn linear_part(&self) -> Matrix3<f64> {
        let m = &self.transformation;
        Matrix3::new(
            m[0][0], m[0][1], m[0][2], //
            m[1][0], m[1][1], m[1][2], //
            m[2][0], m[2][1], m[2][2],
        )
    }

    fn translation(&self) -> Vector3<f64> {
        let m = &self.transformation;
        Vector3::new(m[0][3], m[1][3], m[2][3])
    }
}

#[derive(Debug)]
struct PositionDelegate(ElementKind);

impl ModifierDelegate<AffineTransformationParams> for PositionDelegate {
    fn object_type(&self) -> DataObjectType {
        DataObjectType::Elements(self.0)
    }

    fn is_applicable_to(&self, input: &DataCollection) -> bool {
        input
            .container(self.0)
            .is_some_and(|c| c.contains_property(standard::POSITION))
    }

    fn apply(
        &self,
        params: &AffineTransformationParams,
        state: &mut PipelineFlowState,
        object_id: &str,
    ) -> Result<PipelineStatus, ModifierError> {
        let Some(container) = state.data().and_then(|d| d.container_by_id(object_id)) else {
            return Err(DataError::ObjectNotFound(object_id.to_string()).into());
        };
        if !container.contains_property(standard::POSITION) {
            return Ok(PipelineStatus::success());
        }
        let mask = if params.only_selected {
            Some(
                container
                    .property(standard::SELECTION)
                    .and_then(|p| p.flags())
                    .unwrap_or_else(|| vec![false; container.element_count()]),
            )
        } else {
            None
        };

        let linear = params.linear_part();
        let translation = params.translation();
        let container = state
            .mutable_data()
            .container_mut(object_id)
            .ok_or_else(|| DataError::ObjectNotFound(object_id.to_string()))?;
        let positions = container
            .property_mut(standard::POSITION)
            .and_then(|p| p.as_vector3_mut())
            .ok_or_else(|| DataError::ObjectNotFound(standard::POSITION.to_string()))?;

        let mut transformed = 0;
        for (i, position) in positions.iter_mut().enumerate() {
            if mask.as_ref().is_some_and(|m| !m[i]) {
                continue;
            }
            *position = linear * *position + translation;
            transformed += 1;
        }
        Ok(PipelineStatus::success_with(format!(
            "Transformed {} {}.",
            transformed, self.0
        )))
    }
}

/// Applies an affine transformation to the positions of particles.
#[derive(Debug)]
pub struct AffineTransformationModifier {
    params: AffineTransformationParams,
    delegates: DelegateRegistry<AffineTransformationParams>,
}

impl Default for AffineTransformationModifier {
    fn default() -> Self {
        Self::new(AffineTransformationParams::default())
    }
}

impl AffineTransformationModifier {
    pub const TYPE_NAME: &'static str = "affine-transformation";

    pub fn new(params: AffineTransformationParams) -> Self {
        let mut delegates: DelegateRegistry<AffineTransformationParams> = DelegateRegistry::new();
        delegates.register(Arc::new(PositionDelegate(ElementKind::Particles)));
        Self { params, delegates }
    }

    pub fn params(&self) -> &AffineTransformationParams {
        &self.params
    }
}

impl Modifier for AffineTransformationModifier {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn title(&self) -> String {
        "Affine transformation".to_string()
    }

    fn parameters(&self) -> Result<ParameterSnapshot, ModifierError> {
        ParameterSnapshot::capture(&self.params)
    }

    fn set_parameters(&mut self, params: &ParameterSnapshot) -> Result<(), ModifierError> {
        let params: AffineTransformationParams = params.restore()?;
        if params.transformation.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ModifierError::InvalidParameter {
                name: "transformation".to_string(),
                reason: "matrix elements must be finite".to_string(),
            });
        }
        self.params = params;
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
