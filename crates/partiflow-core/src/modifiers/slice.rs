use crate::core::data::standard;
use crate::core::data::{DataCollection, DataError, ElementKind, Property};
use crate::core::status::PipelineStatus;
use crate::engine::error::ModifierError;
use crate::engine::flow_state::PipelineFlowState;
use crate::engine::modifier::{EvaluationRequest, Modifier, ParameterSnapshot};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub const DELETED_COUNT_ATTRIBUTE: &str = "Slice.deleted_count";
pub const SELECTED_COUNT_ATTRIBUTE: &str = "Slice.selected_count";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SliceParams {
    /// Plane normal; need not be normalized.
    pub normal: [f64; 3],
    /// Signed distance of the plane from the origin along the unit normal.
    pub distance: f64,
    /// With a positive width, particles outside a slab of this width centered
    /// on the plane are cut instead of those on the positive side.
    pub slab_width: f64,
    pub invert: bool,
    /// Select the cut particles instead of deleting them.
    pub create_selection: bool,
    pub only_selected: bool,
}

impl Default for SliceParams {
    fn default() -> Self {
        Self {
            normal: [1.0, 0.0, 0.0],
            distance: 0.0,
            slab_width: 0.0,
            invert: false,
            create_selection: false,
            only_selected: false,
        }
    }
}

impl SliceParams {
    fn unit_normal(&self) -> Result<Vector3<f64>, ModifierError> {
        let normal = Vector3::from(self.normal);
        let length = normal.norm();
        if !length.is_finite() || length == 0.0 {
            return Err(ModifierError::InvalidParameter {
                name: "normal".to_string(),
                reason: "the plane normal must be a non-zero vector".to_string(),
            });
        }
        Ok(normal / length)
    }

    fn is_cut(&self, normal: &Vector3<f64>, position: &Vector3<f64>) -> bool {
        let offset = normal.dot(position) - self.distance;
        if self.slab_width <= 0.0 {
            (offset > 0.0) != self.invert
        } else {
            let inside = offset.abs() <= self.slab_width / 2.0;
            inside == self.invert
        }
    }
}

/// Cuts particles with a plane or slab, either deleting or selecting them.
#[derive(Debug, Default)]
pub struct SliceModifier {
    params: SliceParams,
}

impl SliceModifier {
    pub const TYPE_NAME: &'static str = "slice";

    pub fn new(params: SliceParams) -> Self {
        Self { params }
    }
}

impl Modifier for SliceModifier {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn title(&self) -> String {
        "Slice".to_string()
    }

    fn parameters(&self) -> Result<ParameterSnapshot, ModifierError> {
        ParameterSnapshot::capture(&self.params)
    }

    fn set_parameters(&mut self, params: &ParameterSnapshot) -> Result<(), ModifierError> {
        self.params = params.restore()?;
        Ok(())
    }

    fn is_applicable_to(&self, input: &DataCollection) -> bool {
        input
            .container(ElementKind::Particles)
            .is_some_and(|c| c.contains_property(standard::POSITION))
    }

    fn evaluate_preliminary(
        &self,
        _request: &EvaluationRequest,
        state: &mut PipelineFlowState,
    ) -> Result<(), ModifierError> {
        let normal = self.params.unit_normal()?;
        let input = state.data().ok_or(ModifierError::EmptyInput)?;
        let particles = input.expect_container(ElementKind::Particles)?;
        let positions = particles
            .property(standard::POSITION)
            .and_then(|p| p.as_vector3())
            .ok_or_else(|| {
                ModifierError::NotApplicable("particles have no positions".to_string())
            })?;
        let eligible = if self.params.only_selected {
            Some(
                particles
                    .property(standard::SELECTION)
                    .and_then(|p| p.flags())
                    .unwrap_or_else(|| vec![false; positions.len()]),
            )
        } else {
            None
        };

        let mask: Vec<bool> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                eligible.as_ref().is_none_or(|e| e[i]) && self.params.is_cut(&normal, p)
            })
            .collect();
        let total = mask.len();
        let cut = mask.iter().filter(|&&m| m).count();
        let identifier = particles.identifier().to_string();

        let status = if self.params.create_selection {
            let data = state.mutable_data();
            data.container_mut(&identifier)
                .ok_or_else(|| DataError::ObjectNotFound(identifier.clone()))?
                .insert_property(Property::from_flags(standard::SELECTION, &mask)?)?;
            data.set_attribute(SELECTED_COUNT_ATTRIBUTE, cut);
            format!("{} of {} particles selected.", cut, total)
        } else {
            let data = state.mutable_data();
            if cut > 0 {
                data.container_mut(&identifier)
                    .ok_or_else(|| DataError::ObjectNotFound(identifier.clone()))?
                    .delete_elements(&mask)?;
            }
            data.set_attribute(DELETED_COUNT_ATTRIBUTE, cut);
            format!("{} of {} particles deleted.", cut, total)
        };
        state.set_status(PipelineStatus::success_with(status));
        Ok(())
    }
}
