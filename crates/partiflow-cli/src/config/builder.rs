use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::EvalArgs;
use crate::error::{CliError, Result};
use crate::utils::parser::{self, FrameRange};
use partiflow::engine::config::{AnimationSettings, EvaluatorConfigBuilder, PipelineConfig};

pub fn build_config(args: &EvalArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(pipeline_path) = &args.pipeline {
        FileConfig::from_file(pipeline_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let eval_file = file_config.evaluation.take().unwrap_or_default();
    let break_on_error = args.break_on_error
        || eval_file
            .break_on_error
            .unwrap_or(defaults.break_on_error);

    let frames = match (args.frames, eval_file.frames.as_deref()) {
        (Some(frames), _) => frames,
        (None, Some(raw)) => {
            parser::parse_frame_range(raw).map_err(|e| CliError::Config(e.to_string()))?
        }
        (None, None) => FrameRange::all(),
    };

    let anim_file = file_config.animation.take().unwrap_or_default();
    let ticks_per_frame = args
        .ticks_per_frame
        .or(anim_file.ticks_per_frame)
        .unwrap_or(defaults.ticks_per_frame);

    let pipeline = PipelineConfig {
        animation: AnimationSettings { ticks_per_frame },
        modifiers: file_config.modifiers,
    };
    pipeline.validate()?;

    let evaluator = EvaluatorConfigBuilder::new()
        .break_on_error(break_on_error)
        .build()?;

    Ok(AppConfig {
        input_path: args.input.clone(),
        pipeline,
        evaluator,
        frames,
        save_pipeline: args.save_pipeline.clone(),
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value_str) =
            parser::parse_assignment(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;

        match key {
            "evaluation.break-on-error" => {
                config
                    .evaluation
                    .get_or_insert_with(Default::default)
                    .break_on_error = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid boolean value for {}: {}", key, value_str))
                })?);
            }
            "evaluation.frames" => {
                parser::parse_frame_range(value_str).map_err(|e| CliError::Config(e.to_string()))?;
                config.evaluation.get_or_insert_with(Default::default).frames =
                    Some(value_str.to_string());
            }
            "animation.ticks-per-frame" => {
                config
                    .animation
                    .get_or_insert_with(Default::default)
                    .ticks_per_frame = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid integer value for {}: {}", key, value_str))
                })?);
            }
            _ => match key.strip_prefix("modifiers.") {
                Some(path) => apply_modifier_value(&mut config, key, path, value_str)?,
                None => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            },
        }
    }
    Ok(config)
}

/// Applies `modifiers.<index>.<field>`, where the field is `enabled`,
/// `title` or any modifier parameter.
fn apply_modifier_value(
    config: &mut FileConfig,
    key: &str,
    path: &str,
    value_str: &str,
) -> Result<()> {
    let (index, field) = path.split_once('.').ok_or_else(|| {
        CliError::Config(format!(
            "Invalid modifier key '{}'. Expected modifiers.<index>.<name>.",
            key
        ))
    })?;
    let index: usize = index
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid modifier index in '{}'", key)))?;
    let count = config.modifiers.len();
    let spec = config.modifiers.get_mut(index).ok_or_else(|| {
        CliError::Config(format!(
            "Modifier index {} in '{}' is out of range for a pipeline of {} modifiers",
            index, key, count
        ))
    })?;

    match field {
        "enabled" => {
            spec.enabled = value_str.parse().map_err(|_| {
                CliError::Config(format!("Invalid boolean value for {}: {}", key, value_str))
            })?;
        }
        "title" => spec.title = Some(value_str.to_string()),
        name => {
            spec.params
                .insert(name.to_string(), parser::parse_toml_value(value_str));
        }
    }
    Ok(())
}
