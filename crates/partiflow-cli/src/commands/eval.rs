use super::load_frames;
use crate::cli::EvalArgs;
use crate::config::{AppConfig, build_config};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use partiflow::core::data::DataObject;
use partiflow::engine::evaluator::PipelineEvaluator;
use partiflow::engine::pipeline::Pipeline;
use partiflow::engine::progress::ProgressReporter;
use partiflow::engine::registry::ModifierRegistry;
use partiflow::engine::source::{DataSource, FrameSequenceSource};
use partiflow::workflows::animation::{self, FrameResult};
use std::fmt::Write;
use tracing::{info, trace, warn};

pub fn run(args: EvalArgs) -> Result<()> {
    let config = build_config(&args)?;
    let results = evaluate(&config)?;

    if results.is_empty() {
        warn!("The requested frame range selected no frames.");
        println!("Warning: no frames were evaluated.");
    }
    for result in &results {
        print!("{}", format_frame_summary(result));
    }
    Ok(())
}

/// Builds the pipeline described by `config` and evaluates the selected frames.
pub(crate) fn evaluate(config: &AppConfig) -> Result<Vec<FrameResult>> {
    let frames = load_frames(&config.input_path)?;
    let source =
        FrameSequenceSource::with_ticks_per_frame(frames, config.pipeline.animation.ticks_per_frame);
    let frame_range = config.frames.resolve(source.frame_count());

    let registry = ModifierRegistry::with_builtin();
    let mut pipeline = Pipeline::from_config(&config.pipeline, &registry, Box::new(source))?;
    pipeline.subscribe(|event| trace!(?event, "Pipeline event."));
    info!(
        stages = pipeline.len(),
        frames = ?frame_range,
        "Pipeline assembled."
    );

    let evaluator = PipelineEvaluator::new(config.evaluator);
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let results = animation::evaluate_frames(&mut pipeline, &evaluator, frame_range, &reporter)?;

    if let Some(path) = &config.save_pipeline {
        let content = pipeline.to_config()?.to_toml_string()?;
        std::fs::write(path, content)?;
        info!("Saved pipeline definition to {:?}", path);
    }
    Ok(results)
}

pub(crate) fn format_frame_summary(result: &FrameResult) -> String {
    let mut out = String::new();
    let status = result.state.status();
    let _ = writeln!(out, "Frame {} (t = {}): {}", result.frame, result.time, status.kind());
    for line in status.text().lines() {
        let _ = writeln!(out, "  | {}", line);
    }
    let Some(data) = result.state.data() else {
        let _ = writeln!(out, "  (no data)");
        return out;
    };
    for object in data.objects() {
        match object {
            DataObject::Container(container) => {
                let _ = writeln!(
                    out,
                    "  {}: {} elements",
                    container.identifier(),
                    container.element_count()
                );
            }
            DataObject::Attribute(attribute) => {
                let _ = writeln!(out, "  {} = {}", attribute.name, attribute.value);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parser::FrameRange;
    use partiflow::engine::config::{EvaluatorConfig, ModifierSpec, PipelineConfig};
    use std::fs;
    use tempfile::tempdir;

    const TABLE: &str = "\
frame,x,y,z,selection
0,0.0,0.0,0.0,1
0,1.0,0.0,0.0,0
0,5.0,0.0,0.0,1
1,0.0,0.0,0.0,0
1,4.0,0.0,0.0,0
";

    fn app_config(dir: &std::path::Path, modifiers: Vec<ModifierSpec>) -> AppConfig {
        let input_path = dir.join("particles.csv");
        fs::write(&input_path, TABLE).unwrap();
        AppConfig {
            input_path,
            pipeline: PipelineConfig {
                modifiers,
                ..PipelineConfig::default()
            },
            evaluator: EvaluatorConfig::default(),
            frames: FrameRange::all(),
            save_pipeline: None,
        }
    }

    #[test]
    fn evaluates_all_frames_of_the_table() {
        let dir = tempdir().unwrap();
        let config = app_config(
            dir.path(),
            vec![ModifierSpec::new("slice").with_param("distance", 2.0)],
        );

        let results = evaluate(&config).unwrap();
        assert_eq!(results.len(), 2);
        let summary = format_frame_summary(&results[0]);
        assert!(summary.starts_with("Frame 0 (t = 0):"));
        assert!(summary.contains("particles: 2 elements"));
        assert!(summary.contains("Slice.deleted_count = 1"));
        assert!(format_frame_summary(&results[1]).contains("particles: 1 elements"));
    }

    #[test]
    fn frame_range_limits_the_evaluation() {
        let dir = tempdir().unwrap();
        let mut config = app_config(dir.path(), vec![ModifierSpec::new("invert-selection")]);
        config.frames = FrameRange {
            start: 1,
            end: None,
        };
        let results = evaluate(&config).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].frame, 1);
    }

    #[test]
    fn saves_the_effective_pipeline() {
        let dir = tempdir().unwrap();
        let mut config = app_config(
            dir.path(),
            vec![ModifierSpec::new("cluster-analysis").with_param("cutoff", 1.5)],
        );
        let saved = dir.path().join("saved.toml");
        config.save_pipeline = Some(saved.clone());

        evaluate(&config).unwrap();
        let reloaded = PipelineConfig::load(&saved).unwrap();
        assert_eq!(reloaded.modifiers.len(), 1);
        assert_eq!(reloaded.modifiers[0].type_name, "cluster-analysis");
        assert_eq!(reloaded.modifiers[0].params["cutoff"].as_float(), Some(1.5));
        assert_eq!(
            reloaded.modifiers[0].params["sort-by-size"].as_bool(),
            Some(false)
        );
    }

    #[test]
    fn unknown_modifier_type_fails() {
        let dir = tempdir().unwrap();
        let config = app_config(dir.path(), vec![ModifierSpec::new("no-such-modifier")]);
        assert!(evaluate(&config).is_err());
    }

    #[test]
    fn missing_table_reports_its_path() {
        let dir = tempdir().unwrap();
        let mut config = app_config(dir.path(), vec![]);
        config.input_path = dir.path().join("missing.csv");
        let err = evaluate(&config).unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
    }
}
