use crate::utils::parser::FrameRange;
use partiflow::engine::config::{EvaluatorConfig, PipelineConfig};
use std::path::PathBuf;

pub struct AppConfig {
    pub input_path: PathBuf,
    pub pipeline: PipelineConfig,
    pub evaluator: EvaluatorConfig,
    pub frames: FrameRange,
    pub save_pipeline: Option<PathBuf>,
}
