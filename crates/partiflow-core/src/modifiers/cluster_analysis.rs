use crate::core::data::standard;
use crate::core::data::{DataCollection, DataError, ElementKind, Property, PropertyData};
use crate::core::status::PipelineStatus;
use crate::engine::error::ModifierError;
use crate::engine::flow_state::PipelineFlowState;
use crate::engine::modifier::{
    ComputeEngine, Evaluation, EvaluationRequest, Modifier, ParameterSnapshot,
};
use crate::engine::request::RequestTicket;
use kiddo::{KdTree, SquaredEuclidean};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

pub const CLUSTER_COUNT_ATTRIBUTE: &str = "ClusterAnalysis.cluster_count";
pub const LARGEST_SIZE_ATTRIBUTE: &str = "ClusterAnalysis.largest_size";

/// Number of particles visited between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ClusterAnalysisParams {
    pub cutoff: f64,
    pub sort_by_size: bool,
    /// Cluster only selected particles; all others get cluster id 0.
    pub only_selected: bool,
}

impl Default for ClusterAnalysisParams {
    fn default() -> Self {
        Self {
            cutoff: 3.2,
            sort_by_size: false,
            only_selected: false,
        }
    }
}

impl ClusterAnalysisParams {
    fn validate(&self) -> Result<(), ModifierError> {
        if !self.cutoff.is_finite() || self.cutoff <= 0.0 {
            return Err(ModifierError::InvalidParameter {
                name: "cutoff".to_string(),
                reason: format!("must be a positive number, got {}", self.cutoff),
            });
        }
        Ok(())
    }
}

/// Decomposes particles into clusters of neighbors closer than a cutoff.
///
/// The neighbor search runs on a [`ClusterEngine`] during full evaluation.
/// Preliminary evaluation passes the input through unchanged.
#[derive(Debug, Default)]
pub struct ClusterAnalysisModifier {
    params: ClusterAnalysisParams,
}

impl ClusterAnalysisModifier {
    pub const TYPE_NAME: &'static str = "cluster-analysis";

    pub fn new(params: ClusterAnalysisParams) -> Self {
        Self { params }
    }
}

impl Modifier for ClusterAnalysisModifier {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn title(&self) -> String {
        "Cluster analysis".to_string()
    }

    fn parameters(&self) -> Result<ParameterSnapshot, ModifierError> {
        ParameterSnapshot::capture(&self.params)
    }

    fn set_parameters(&mut self, params: &ParameterSnapshot) -> Result<(), ModifierError> {
        let params: ClusterAnalysisParams = params.restore()?;
        params.validate()?;
        self.params = params;
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
        self.params.validate()?;
        let input = state.data().ok_or(ModifierError::EmptyInput)?;
        input.expect_container(ElementKind::Particles)?;
        Ok(())
    }

    fn evaluate(
        &self,
        _request: &EvaluationRequest,
        state: &mut PipelineFlowState,
    ) -> Result<Evaluation, ModifierError> {
        self.params.validate()?;
        let input = state.data().ok_or(ModifierError::EmptyInput)?;
        let particles = input.expect_container(ElementKind::Particles)?;
        let positions = particles
            .property(standard::POSITION)
            .and_then(|p| p.as_vector3())
            .ok_or_else(|| ModifierError::NotApplicable("particles have no positions".to_string()))?
            .iter()
            .map(|p| [p.x, p.y, p.z])
            .collect::<Vec<_>>();
        let eligible = self.params.only_selected.then(|| {
            particles
                .property(standard::SELECTION)
                .and_then(|p| p.flags())
                .unwrap_or_else(|| vec![false; positions.len()])
        });

        Ok(Evaluation::Deferred(Box::new(ClusterEngine {
            container: particles.identifier().to_string(),
            positions,
            eligible,
            cutoff: self.params.cutoff,
            sort_by_size: self.params.sort_by_size,
            result: None,
        })))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ClusterResult {
    ids: Vec<i64>,
    cluster_count: usize,
    largest_size: usize,
}

/// Neighbor search and flood fill over a snapshot of the particle positions.
#[derive(Debug)]
pub struct ClusterEngine {
    container: String,
    positions: Vec<[f64; 3]>,
    eligible: Option<Vec<bool>>,
    cutoff: f64,
    sort_by_size: bool,
    result: Option<ClusterResult>,
}

impl ClusterEngine {
    fn is_eligible(&self, index: usize) -> bool {
        self.eligible.as_ref().is_none_or(|e| e[index])
    }

    fn compute(&self, ticket: &RequestTicket) -> Result<ClusterResult, ModifierError> {
        let count = self.positions.len();
        let mut ids = vec![0_i64; count];

        let members: Vec<usize> = (0..count).filter(|&i| self.is_eligible(i)).collect();
        if members.is_empty() {
            return Ok(ClusterResult {
                ids,
                cluster_count: 0,
                largest_size: 0,
            });
        }
        // Coincident particles share one tree entry. The tree cannot hold more
        // than a bucket's worth of identical points.
        let mut sites: Vec<[f64; 3]> = Vec::new();
        let mut occupants: Vec<Vec<usize>> = Vec::new();
        let mut site_of: HashMap<[u64; 3], usize> = HashMap::new();
        for &index in &members {
            let position = self.positions[index];
            // Adding zero folds -0.0 into 0.0.
            let key = position.map(|c| (c + 0.0).to_bits());
            let site = *site_of.entry(key).or_insert_with(|| {
                sites.push(position);
                occupants.push(Vec::new());
                sites.len() - 1
            });
            occupants[site].push(index);
        }
        let tree: KdTree<f64, 3> = (&sites).into();
        let cutoff_sq = self.cutoff * self.cutoff;

        let mut sizes: Vec<usize> = Vec::new();
        let mut queue = VecDeque::new();
        let mut visited = 0_usize;
        for &seed in &members {
            if ids[seed] != 0 {
                continue;
            }
            sizes.push(1);
            let cluster = sizes.len() as i64;
            ids[seed] = cluster;
            queue.push_back(seed);
            while let Some(current) = queue.pop_front() {
                visited += 1;
                if visited % CANCEL_CHECK_INTERVAL == 0 && !ticket.is_current() {
                    return Err(ModifierError::Canceled);
                }
                for neighbor in tree.within_unsorted::<SquaredEuclidean>(&self.positions[current], cutoff_sq) {
                    for &index in &occupants[neighbor.item as usize] {
                        if ids[index] == 0 {
                            ids[index] = cluster;
                            if let Some(size) = sizes.last_mut() {
                                *size += 1;
                            }
                            queue.push_back(index);
                        }
                    }
                }
            }
        }

        let mut largest_size = sizes.iter().copied().max().unwrap_or(0);
        if self.sort_by_size {
            let mut order: Vec<usize> = (0..sizes.len()).collect();
            order.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]));
            let mut remap = vec![0_i64; sizes.len() + 1];
            for (rank, &old) in order.iter().enumerate() {
                remap[old + 1] = rank as i64 + 1;
            }
            for id in &mut ids {
                *id = remap[*id as usize];
            }
            largest_size = order.first().map_or(0, |&first| sizes[first]);
        }

        Ok(ClusterResult {
            ids,
            cluster_count: sizes.len(),
            largest_size,
        })
    }
}

impl ComputeEngine for ClusterEngine {
    fn perform(&mut self, ticket: &RequestTicket) -> Result<(), ModifierError> {
        let result = self.compute(ticket)?;
        debug!(
            particles = self.positions.len(),
            clusters = result.cluster_count,
            "Cluster analysis finished."
        );
        self.result = Some(result);
        Ok(())
    }

    fn emit_results(self: Box<Self>, state: &mut PipelineFlowState) -> Result<(), ModifierError> {
        let result = self
            .result
            .ok_or_else(|| ModifierError::Computation("cluster analysis did not run".to_string()))?;
        let data = state.mutable_data();
        data.container_mut(&self.container)
            .ok_or_else(|| DataError::ObjectNotFound(self.container.clone()))?
            .insert_property(Property::new(standard::CLUSTER, PropertyData::Int(result.ids))?)?;
        data.set_attribute(CLUSTER_COUNT_ATTRIBUTE, result.cluster_count);
        if self.sort_by_size {
            data.set_attribute(LARGEST_SIZE_ATTRIBUTE, result.largest_size);
        }
        state.set_status(PipelineStatus::success_with(format!(
            "Found {} clusters.",
            result.cluster_count
        )));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::{AttributeValue, PropertyContainer};
    use crate::core::time::TimeInterval;
    use crate::engine::request::RequestTracker;
    use nalgebra::Vector3;

    fn particles(points: &[[f64; 3]], selection: Option<&[bool]>) -> PipelineFlowState {
        let positions = points.iter().map(|p| Vector3::new(p[0], p[1], p[2])).collect();
        let mut container = PropertyContainer::new(ElementKind::Particles, points.len());
        container
            .insert_property(Property::new(standard::POSITION, PropertyData::Vector3(positions)).unwrap())
            .unwrap();
        if let Some(flags) = selection {
            container
                .insert_property(Property::from_flags(standard::SELECTION, flags).unwrap())
                .unwrap();
        }
        let mut data = DataCollection::new();
        data.add(container.into()).unwrap();
        PipelineFlowState::new(data, TimeInterval::infinite())
    }

    fn run(params: ClusterAnalysisParams, state: &mut PipelineFlowState) -> Result<(), ModifierError> {
        let modifier = ClusterAnalysisModifier::new(params);
        match modifier.evaluate(&EvaluationRequest::at(0), state)? {
            Evaluation::Deferred(mut engine) => {
                engine.perform(&RequestTicket::detached())?;
                engine.emit_results(state)
            }
            Evaluation::Ready => panic!("cluster analysis must defer its work"),
        }
    }

    fn cluster_ids(state: &PipelineFlowState) -> Vec<i64> {
        state
            .data()
            .unwrap()
            .container(ElementKind::Particles)
            .unwrap()
            .property(standard::CLUSTER)
            .unwrap()
            .as_int()
            .unwrap()
            .to_vec()
    }

    /// A pair near the origin, a chain of three further out, and a loner.
    fn two_groups_and_a_loner() -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [11.0, 0.0, 0.0],
            [12.0, 0.0, 0.0],
            [30.0, 0.0, 0.0],
        ]
    }

    fn params(cutoff: f64) -> ClusterAnalysisParams {
        ClusterAnalysisParams {
            cutoff,
            ..ClusterAnalysisParams::default()
        }
    }

    #[test]
    fn clusters_are_numbered_in_seed_order() {
        let mut state = particles(&two_groups_and_a_loner(), None);
        run(params(1.5), &mut state).unwrap();
        assert_eq!(cluster_ids(&state), vec![1, 2, 1, 2, 2, 3]);
        assert_eq!(
            state.data().unwrap().attribute(CLUSTER_COUNT_ATTRIBUTE),
            Some(&AttributeValue::Int(3))
        );
        assert_eq!(state.status().text(), "Found 3 clusters.");
        assert!(state.data().unwrap().attribute(LARGEST_SIZE_ATTRIBUTE).is_none());
    }

    #[test]
    fn chains_connect_transitively() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0]];
        let mut state = particles(&points, None);
        run(params(1.1), &mut state).unwrap();
        assert_eq!(cluster_ids(&state), vec![1, 1, 1, 1]);
    }

    #[test]
    fn sort_by_size_renumbers_largest_first() {
        let mut state = particles(&two_groups_and_a_loner(), None);
        let params = ClusterAnalysisParams {
            sort_by_size: true,
            ..params(1.5)
        };
        run(params, &mut state).unwrap();
        assert_eq!(cluster_ids(&state), vec![2, 1, 2, 1, 1, 3]);
        assert_eq!(
            state.data().unwrap().attribute(LARGEST_SIZE_ATTRIBUTE),
            Some(&AttributeValue::Int(3))
        );
    }

    #[test]
    fn unselected_particles_get_cluster_zero() {
        let selection = [true, true, false, true, true, false];
        let mut state = particles(&two_groups_and_a_loner(), Some(&selection));
        let params = ClusterAnalysisParams {
            only_selected: true,
            ..params(1.5)
        };
        run(params, &mut state).unwrap();
        assert_eq!(cluster_ids(&state), vec![1, 2, 0, 2, 2, 0]);
    }

    #[test]
    fn only_selected_without_selection_finds_nothing() {
        let mut state = particles(&two_groups_and_a_loner(), None);
        let params = ClusterAnalysisParams {
            only_selected: true,
            ..params(1.5)
        };
        run(params, &mut state).unwrap();
        assert_eq!(cluster_ids(&state), vec![0; 6]);
        assert_eq!(state.status().text(), "Found 0 clusters.");
    }

    #[test]
    fn coincident_particles_fall_into_one_cluster() {
        let mut points = vec![[1.0, 1.0, 1.0]; 40];
        points.push([20.0, 1.0, 1.0]);
        points.push([-0.0, 0.0, 0.0]);
        points.push([0.0, -0.0, 0.0]);
        let mut state = particles(&points, None);
        let params = ClusterAnalysisParams {
            sort_by_size: true,
            ..params(0.5)
        };
        run(params, &mut state).unwrap();

        let ids = cluster_ids(&state);
        assert!(ids[..40].iter().all(|&id| id == 1));
        assert_eq!(ids[40..], [3, 2, 2]);
        assert_eq!(
            state.data().unwrap().attribute(LARGEST_SIZE_ATTRIBUTE),
            Some(&AttributeValue::Int(40))
        );
    }

    #[test]
    fn preliminary_evaluation_passes_input_through() {
        let input = particles(&two_groups_and_a_loner(), None);
        let mut state = input.clone();
        ClusterAnalysisModifier::default()
            .evaluate_preliminary(&EvaluationRequest::at(0), &mut state)
            .unwrap();
        assert!(state.shares_data_with(&input));
    }

    #[test]
    fn stale_ticket_cancels_large_computation() {
        let points: Vec<[f64; 3]> = (0..2 * CANCEL_CHECK_INTERVAL)
            .map(|i| [i as f64, (i * 37 % 101) as f64, (i * 53 % 97) as f64])
            .collect();
        let mut state = particles(&points, None);
        let tracker = RequestTracker::new();
        let ticket = tracker.begin();
        tracker.supersede();
        let Evaluation::Deferred(mut engine) = ClusterAnalysisModifier::default()
            .evaluate(&EvaluationRequest::at(0), &mut state)
            .unwrap()
        else {
            panic!("cluster analysis must defer its work");
        };
        assert_eq!(engine.perform(&ticket), Err(ModifierError::Canceled));
    }

    #[test]
    fn non_positive_cutoff_is_rejected() {
        let mut modifier = ClusterAnalysisModifier::default();
        let snapshot = ParameterSnapshot::capture(&params(0.0)).unwrap();
        assert!(matches!(
            modifier.set_parameters(&snapshot),
            Err(ModifierError::InvalidParameter { ref name, .. }) if name == "cutoff"
        ));
        assert_eq!(modifier.parameters().unwrap(), ParameterSnapshot::capture(&params(3.2)).unwrap());
    }

    #[test]
    fn applicable_only_to_positioned_particles() {
        let modifier = ClusterAnalysisModifier::default();
        assert!(modifier.is_applicable_to(particles(&[[0.0; 3]], None).data().unwrap()));
        assert!(!modifier.is_applicable_to(&DataCollection::new()));
    }
}
