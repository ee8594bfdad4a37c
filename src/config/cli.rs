use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

pub const DEFAULT_OUTPUT: &str = "output.png";

/// Command-line arguments for the striprender binary.
#[derive(Debug, Parser)]
#[command(
    name = "striprender",
    version,
    about = "Render a large document as horizontal strips on a worker pool and stitch them together"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "STRIPRENDER_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Rasterize every strip and stitch them into the output image.
    Render(RenderArgs),
    /// Print the strip layout without invoking the rasterizer or stitcher.
    Plan(PlanArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: JobOverrides,

    #[command(flatten)]
    pub scratch: ScratchOverrides,

    /// Document to render.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Path of the stitched image.
    #[arg(
        value_name = "OUTPUT",
        value_hint = ValueHint::FilePath,
        default_value = DEFAULT_OUTPUT
    )]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub overrides: JobOverrides,

    /// Emit the plan as JSON instead of a table.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Document to plan; only read when the region has to be probed.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct JobOverrides {
    /// Override the number of worker threads.
    #[arg(short = 't', long = "threads", value_name = "COUNT")]
    pub threads: Option<u32>,

    /// Override the number of strips per worker thread.
    #[arg(short = 'u', long = "units-per-thread", value_name = "COUNT")]
    pub units_per_thread: Option<u32>,

    /// Source region in document units; probed from the document when absent.
    #[arg(long = "region", value_name = "X0:Y0:X1:Y1", allow_hyphen_values = true)]
    pub region: Option<String>,

    /// Override the output width in pixels.
    #[arg(long = "width", value_name = "PX")]
    pub width: Option<i64>,

    /// Override the output height in pixels.
    #[arg(long = "height", value_name = "PX")]
    pub height: Option<i64>,

    /// How strip heights map into the output (proportional|independent).
    #[arg(long = "split-mode", value_name = "MODE")]
    pub split_mode: Option<String>,

    /// Override the rasterizer executable.
    #[arg(long = "rasterizer", value_name = "PATH")]
    pub rasterizer: Option<PathBuf>,

    /// Override the stitcher executable.
    #[arg(long = "stitcher", value_name = "PATH")]
    pub stitcher: Option<PathBuf>,

    /// Override the dimension probe executable.
    #[arg(long = "probe", value_name = "PATH")]
    pub probe: Option<PathBuf>,

    /// Override the intermediate tile format (file extension).
    #[arg(long = "tile-format", value_name = "EXT")]
    pub tile_format: Option<String>,

    /// Log at debug level.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ScratchOverrides {
    /// Directory in which the per-job scratch directory is created.
    #[arg(long = "work-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub work_dir: Option<PathBuf>,

    /// Keep intermediate tiles after a successful stitch.
    #[arg(long = "keep-artifacts", action = ArgAction::SetTrue)]
    pub keep_artifacts: bool,
}
