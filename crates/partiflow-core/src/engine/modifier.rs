use super::error::ModifierError;
use super::flow_state::PipelineFlowState;
use super::request::RequestTicket;
use crate::core::data::DataCollection;
use crate::core::time::{TimeInterval, TimePoint};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Value snapshot of a modifier's parameters.
///
/// Snapshots take part in stage cache keys, so two modifiers with equal
/// parameter values produce equal snapshots regardless of identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSnapshot(toml::Table);

impl ParameterSnapshot {
    pub fn capture<P: Serialize>(params: &P) -> Result<Self, ModifierError> {
        toml::Table::try_from(params)
            .map(Self)
            .map_err(|e| ModifierError::InvalidParameter {
                name: "parameters".to_string(),
                reason: e.to_string(),
            })
    }

    pub fn restore<P: DeserializeOwned>(&self) -> Result<P, ModifierError> {
        self.0
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| ModifierError::InvalidParameter {
                name: "parameters".to_string(),
                reason: e.message().to_string(),
            })
    }

    pub fn from_table(table: toml::Table) -> Self {
        Self(table)
    }

    pub fn as_table(&self) -> &toml::Table {
        &self.0
    }

    pub fn into_table(self) -> toml::Table {
        self.0
    }

    /// Returns a copy of this snapshot with the top-level keys of `patch`
    /// overriding its own.
    pub fn merged(&self, patch: &toml::Table) -> Self {
        let mut table = self.0.clone();
        for (key, value) in patch {
            table.insert(key.clone(), value.clone());
        }
        Self(table)
    }
}

/// What a modifier is asked to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub time: TimePoint,
}

impl EvaluationRequest {
    pub fn at(time: TimePoint) -> Self {
        Self { time }
    }
}

/// Result of starting a full modifier evaluation.
pub enum Evaluation {
    /// The flow state passed to the modifier already holds the output.
    Ready,
    /// The heavy part of the work still has to run on the returned engine.
    Deferred(Box<dyn ComputeEngine>),
}

impl fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Ready => f.write_str("Ready"),
            Evaluation::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Deferred computation of an asynchronous modifier.
///
/// Engines capture everything they need from the input when they are
/// created, so they can run without access to the pipeline. `perform` should
/// poll the ticket regularly and give up with [`ModifierError::Canceled`] once
/// it is no longer current.
pub trait ComputeEngine: Send {
    fn perform(&mut self, ticket: &RequestTicket) -> Result<(), ModifierError>;

    /// Writes the computed results into the stage's output.
    fn emit_results(self: Box<Self>, state: &mut PipelineFlowState) -> Result<(), ModifierError>;

    fn validity(&self) -> TimeInterval {
        TimeInterval::infinite()
    }
}

/// A pipeline stage transformation.
///
/// Modifiers receive their output flow state pre-filled with a shared copy of
/// their input and must route every change through
/// [`PipelineFlowState::mutable_data`], so upstream caches are never touched.
pub trait Modifier: Send + Sync + fmt::Debug {
    fn type_name(&self) -> &'static str;

    fn title(&self) -> String {
        self.type_name().to_string()
    }

    fn parameters(&self) -> Result<ParameterSnapshot, ModifierError>;

    fn set_parameters(&mut self, params: &ParameterSnapshot) -> Result<(), ModifierError>;

    fn is_applicable_to(&self, input: &DataCollection) -> bool;

    /// Interval around `time` over which the modifier's behavior is constant.
    fn validity(&self, _time: TimePoint) -> TimeInterval {
        TimeInterval::infinite()
    }

    /// Computes a quick result without blocking.
    fn evaluate_preliminary(
        &self,
        request: &EvaluationRequest,
        state: &mut PipelineFlowState,
    ) -> Result<(), ModifierError>;

    /// Computes the full result, possibly deferring heavy work to a
    /// [`ComputeEngine`]. Synchronous modifiers keep the default.
    fn evaluate(
        &self,
        request: &EvaluationRequest,
        state: &mut PipelineFlowState,
    ) -> Result<Evaluation, ModifierError> {
        self.evaluate_preliminary(request, state)?;
        Ok(Evaluation::Ready)
    }
}

/// A modifier that may be referenced from several chain positions or from
/// outside the pipeline.
pub type SharedModifier = Arc<RwLock<dyn Modifier>>;

pub fn share<M: Modifier + 'static>(modifier: M) -> SharedModifier {
    Arc::new(RwLock::new(modifier))
}

pub fn read_modifier(modifier: &SharedModifier) -> RwLockReadGuard<'_, dyn Modifier + 'static> {
    modifier.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write_modifier(modifier: &SharedModifier) -> RwLockWriteGuard<'_, dyn Modifier + 'static> {
    modifier.write().unwrap_or_else(PoisonError::into_inner)
}
