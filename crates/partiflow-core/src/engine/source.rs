use super::flow_state::PipelineFlowState;
use crate::core::data::DataCollection;
use crate::core::status::PipelineStatus;
use crate::core::time::{TimeInterval, TimePoint, time_negative_infinity, time_positive_infinity};
use std::fmt;
use std::sync::Arc;

/// Default animation speed: 30 frames per second at 4800 ticks per second.
pub const DEFAULT_TICKS_PER_FRAME: TimePoint = 160;

/// Name of the attribute sources attach to report the frame they produced.
pub const SOURCE_FRAME_ATTRIBUTE: &str = "SourceFrame";

/// The root of a pipeline chain.
pub trait DataSource: Send + Sync + fmt::Debug {
    fn type_name(&self) -> &'static str;

    /// Produces the source data for `time`, together with its validity.
    fn evaluate(&self, time: TimePoint) -> PipelineFlowState;

    /// Content revision, changed whenever the source's data is replaced.
    fn revision(&self) -> u64;

    fn frame_count(&self) -> usize {
        1
    }

    fn ticks_per_frame(&self) -> TimePoint {
        DEFAULT_TICKS_PER_FRAME
    }

    fn time_at_frame(&self, _frame: usize) -> TimePoint {
        0
    }

    fn frame_at_time(&self, _time: TimePoint) -> usize {
        0
    }
}

/// A source holding a single, time-independent collection.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    data: Arc<DataCollection>,
    revision: u64,
}

impl StaticSource {
    pub fn new(data: DataCollection) -> Self {
        Self {
            data: Arc::new(data),
            revision: 1,
        }
    }

    pub fn data(&self) -> &DataCollection {
        &self.data
    }

    pub fn set_data(&mut self, data: DataCollection) {
        self.data = Arc::new(data);
        self.revision += 1;
    }
}

impl DataSource for StaticSource {
    fn type_name(&self) -> &'static str {
        "static"
    }

    fn evaluate(&self, _time: TimePoint) -> PipelineFlowState {
        PipelineFlowState::from_shared(Arc::clone(&self.data), TimeInterval::infinite())
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

/// A source with one collection per animation frame.
///
/// Frame `i` is shown from time `i * ticks_per_frame` until just before the
/// next frame starts. The first frame also covers all earlier times and the
/// last frame all later ones.
#[derive(Debug, Clone)]
pub struct FrameSequenceSource {
    frames: Vec<Arc<DataCollection>>,
    ticks_per_frame: TimePoint,
    revision: u64,
}

impl FrameSequenceSource {
    pub fn new(frames: Vec<DataCollection>) -> Self {
        Self::with_ticks_per_frame(frames, DEFAULT_TICKS_PER_FRAME)
    }

    /// Creates a frame sequence with a custom playback speed. Non-positive
    /// `ticks_per_frame` values are clamped to one tick.
    pub fn with_ticks_per_frame(frames: Vec<DataCollection>, ticks_per_frame: TimePoint) -> Self {
        Self {
            frames: frames.into_iter().map(Arc::new).collect(),
            ticks_per_frame: ticks_per_frame.max(1),
            revision: 1,
        }
    }

    pub fn frame(&self, index: usize) -> Option<&DataCollection> {
        self.frames.get(index).map(|f| f.as_ref())
    }

    pub fn set_frames(&mut self, frames: Vec<DataCollection>) {
        self.frames = frames.into_iter().map(Arc::new).collect();
        self.revision += 1;
    }

    fn frame_interval(&self, frame: usize) -> TimeInterval {
        let start = if frame == 0 {
            time_negative_infinity()
        } else {
            self.time_at_frame(frame)
        };
        let end = if frame + 1 >= self.frames.len() {
            time_positive_infinity()
        } else {
            self.time_at_frame(frame + 1) - 1
        };
        TimeInterval::new(start, end)
    }
}

impl DataSource for FrameSequenceSource {
    fn type_name(&self) -> &'static str {
        "frame-sequence"
    }

    fn evaluate(&self, time: TimePoint) -> PipelineFlowState {
        let frame = self.frame_at_time(time);
        let Some(data) = self.frames.get(frame) else {
            let mut state = PipelineFlowState::empty();
            state.set_status(PipelineStatus::error("The source does not contain any frames."));
            return state;
        };
        let mut state = PipelineFlowState::from_shared(Arc::clone(data), self.frame_interval(frame));
        state.mutable_data().set_attribute(SOURCE_FRAME_ATTRIBUTE, frame);
        state
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn ticks_per_frame(&self) -> TimePoint {
        self.ticks_per_frame
    }

    fn time_at_frame(&self, frame: usize) -> TimePoint {
        TimePoint::try_from(frame)
            .ok()
            .and_then(|f| f.checked_mul(self.ticks_per_frame))
            .unwrap_or(time_positive_infinity())
    }

    fn frame_at_time(&self, time: TimePoint) -> usize {
        if self.frames.is_empty() || time <= 0 {
            return 0;
        }
        let frame = usize::try_from(time / self.ticks_per_frame).unwrap_or(0);
        frame.min(self.frames.len() - 1)
    }
}
