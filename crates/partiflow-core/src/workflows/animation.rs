use crate::core::time::TimePoint;
use crate::engine::error::PipelineError;
use crate::engine::evaluator::PipelineEvaluator;
use crate::engine::flow_state::PipelineFlowState;
use crate::engine::pipeline::Pipeline;
use crate::engine::progress::{Progress, ProgressReporter};
use std::ops::Range;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Pipeline output for one animation frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub frame: usize,
    pub time: TimePoint,
    pub state: PipelineFlowState,
}

/// Evaluates `pipeline` for every frame in `frames`, in order.
///
/// Frames past the end of the source's animation are skipped with a warning.
/// Caches persist in the pipeline, so evaluating the same range again only
/// recomputes the stages whose inputs changed in between.
///
/// # Errors
///
/// Returns [`PipelineError::Superseded`] if the pipeline is edited, or its
/// request tracker is told to supersede, while the frames are being computed.
#[instrument(skip_all, name = "animation_workflow")]
pub fn evaluate_frames(
    pipeline: &mut Pipeline,
    evaluator: &PipelineEvaluator,
    frames: Range<usize>,
    reporter: &ProgressReporter,
) -> Result<Vec<FrameResult>, PipelineError> {
    let frame_count = pipeline.source().frame_count();
    let end = frames.end.min(frame_count);
    if end < frames.end {
        warn!(
            requested = frames.end,
            available = frame_count,
            "Frame range exceeds the source animation; truncating."
        );
        reporter.report(Progress::Message(format!(
            "Only {} frames available; skipping frames {}..{}.",
            frame_count,
            end.max(frames.start),
            frames.end
        )));
    }
    let frames = frames.start..end.max(frames.start);

    info!(
        frames = frames.len(),
        stages = pipeline.len(),
        "Evaluating pipeline over frame range."
    );
    reporter.report(Progress::EvaluationStart {
        total_frames: frames.len() as u64,
    });

    let mut results = Vec::with_capacity(frames.len());
    for frame in frames {
        reporter.report(Progress::FrameStart { frame });
        let time = pipeline.source().time_at_frame(frame);
        let state = evaluator.evaluate(pipeline, time)?;
        reporter.report(Progress::FrameFinish {
            frame,
            status: state.status().kind(),
        });
        results.push(FrameResult { frame, time, state });
    }

    reporter.report(Progress::EvaluationFinish);
    info!("Frame range evaluation finished.");
    Ok(results)
}

/// Evaluates several unrelated pipelines at the same `time`.
///
/// Each pipeline keeps its own caches and request tracker. With the `parallel`
/// feature the chains are evaluated concurrently on the rayon thread pool.
/// Results are returned in input order.
#[instrument(skip_all, name = "independent_workflow")]
pub fn evaluate_independent(
    pipelines: &mut [Pipeline],
    evaluator: &PipelineEvaluator,
    time: TimePoint,
) -> Vec<Result<PipelineFlowState, PipelineError>> {
    info!(pipelines = pipelines.len(), time, "Evaluating independent pipelines.");

    #[cfg(not(feature = "parallel"))]
    let iter = pipelines.iter_mut();

    #[cfg(feature = "parallel")]
    let iter = pipelines.par_iter_mut();

    iter.map(|pipeline| evaluator.evaluate(pipeline, time))
        .collect()
}
