use crate::utils::parser::{self, FrameRange};
use clap::{Args, Parser, Subcommand};
use partiflow::core::time::TimePoint;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Partiflow CLI - Evaluate caching modifier pipelines over time-dependent particle datasets.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a modifier pipeline over the frames of a particle table.
    Eval(EvalArgs),
    /// List the available modifier types.
    Modifiers(ModifiersArgs),
}

/// Arguments for the `eval` subcommand.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Path to the input particle table (CSV with frame,x,y,z,... columns).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to the pipeline definition in TOML format.
    /// Without it, the input is evaluated through an empty pipeline.
    #[arg(short, long, value_name = "PATH")]
    pub pipeline: Option<PathBuf>,

    /// Frames to evaluate, e.g. '3', '0..10' (end exclusive), '0..=9' or '5..'.
    #[arg(short, long, value_name = "RANGE", value_parser = parser::parse_frame_range)]
    pub frames: Option<FrameRange>,

    /// Override the animation speed of the pipeline definition.
    #[arg(long, value_name = "TICKS")]
    pub ticks_per_frame: Option<TimePoint>,

    /// Stop walking the chain at the first stage that reports an error.
    #[arg(long)]
    pub break_on_error: bool,

    /// Write the effective pipeline definition to this path after evaluation.
    #[arg(long, value_name = "PATH")]
    pub save_pipeline: Option<PathBuf>,

    /// Set a specific configuration value, overriding the pipeline file.
    /// Can be used multiple times. Example: -S modifiers.0.cutoff=2.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `modifiers` subcommand.
#[derive(Args, Debug)]
pub struct ModifiersArgs {
    /// Mark the modifiers applicable to the first frame of this particle table.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,
}
