use crate::core::status::StatusKind;

/// Progress of a multi-frame evaluation, as seen by a front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    EvaluationStart { total_frames: u64 },
    FrameStart { frame: usize },
    FrameFinish { frame: usize, status: StatusKind },
    EvaluationFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
