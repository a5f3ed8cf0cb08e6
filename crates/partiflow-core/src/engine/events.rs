use super::pipeline::ModAppId;
use crate::core::status::StatusKind;
use crate::core::time::TimePoint;

/// Position in a pipeline chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Source,
    Modifier(ModAppId),
}

/// Change and evaluation notifications emitted by a pipeline.
///
/// Events are delivered synchronously, in the order they occur, before the
/// emitting operation returns.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageInserted { id: ModAppId, index: usize },
    StageRemoved { id: ModAppId },
    StageMoved { id: ModAppId, from: usize, to: usize },
    /// The stage's cached output was dropped; downstream stages pick up the
    /// change on their next evaluation.
    StageInvalidated { stage: Stage },
    CacheHit { stage: Stage, time: TimePoint },
    StageEvaluated { stage: Stage, time: TimePoint, status: StatusKind },
    EvaluationSuperseded { time: TimePoint },
}

pub type EventCallback = Box<dyn Fn(&PipelineEvent) + Send + Sync>;
