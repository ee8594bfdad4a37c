//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::{
    application::coordinator::DEFAULT_TILE_EXTENSION,
    domain::{Region, SplitMode},
    infra::tools::{DEFAULT_PROBE, DEFAULT_RASTERIZER, DEFAULT_STITCHER},
};

mod cli;

pub use cli::{
    CliArgs, Command, DEFAULT_OUTPUT, JobOverrides, PlanArgs, RenderArgs, ScratchOverrides,
};

const LOCAL_CONFIG_BASENAME: &str = "striprender";
const ENV_PREFIX: &str = "STRIPRENDER";
const DEFAULT_THREADS: u32 = 7;
const DEFAULT_UNITS_PER_THREAD: u32 = 4;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub pool: PoolSettings,
    pub geometry: GeometrySettings,
    pub tools: ToolSettings,
    pub scratch: ScratchSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub threads: NonZeroU32,
    pub units_per_thread: NonZeroU32,
}

impl PoolSettings {
    /// Total number of strips; the product is validated to fit in `u32`.
    pub fn unit_count(&self) -> usize {
        self.threads.get() as usize * self.units_per_thread.get() as usize
    }
}

#[derive(Debug, Clone)]
pub struct GeometrySettings {
    pub region: Option<Region>,
    pub target_width: Option<i64>,
    pub target_height: Option<i64>,
    pub split_mode: SplitMode,
}

#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub rasterizer: PathBuf,
    pub stitcher: PathBuf,
    pub probe: PathBuf,
    pub tile_format: String,
}

#[derive(Debug, Clone)]
pub struct ScratchSettings {
    pub work_dir: Option<PathBuf>,
    pub keep_artifacts: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Render(args) => {
            raw.apply_job_overrides(&args.overrides);
            raw.apply_scratch_overrides(&args.scratch);
        }
        Command::Plan(args) => raw.apply_job_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    pool: RawPoolSettings,
    geometry: RawGeometrySettings,
    tools: RawToolSettings,
    scratch: RawScratchSettings,
}

impl RawSettings {
    fn apply_job_overrides(&mut self, overrides: &JobOverrides) {
        if let Some(threads) = overrides.threads {
            self.pool.threads = Some(threads);
        }
        if let Some(units) = overrides.units_per_thread {
            self.pool.units_per_thread = Some(units);
        }
        if let Some(region) = overrides.region.as_ref() {
            self.geometry.region = Some(region.clone());
        }
        if let Some(width) = overrides.width {
            self.geometry.width = Some(width);
        }
        if let Some(height) = overrides.height {
            self.geometry.height = Some(height);
        }
        if let Some(mode) = overrides.split_mode.as_ref() {
            self.geometry.split_mode = Some(mode.clone());
        }
        if let Some(path) = overrides.rasterizer.as_ref() {
            self.tools.rasterizer = Some(path.clone());
        }
        if let Some(path) = overrides.stitcher.as_ref() {
            self.tools.stitcher = Some(path.clone());
        }
        if let Some(path) = overrides.probe.as_ref() {
            self.tools.probe = Some(path.clone());
        }
        if let Some(format) = overrides.tile_format.as_ref() {
            self.tools.tile_format = Some(format.clone());
        }
        if overrides.verbose {
            self.logging.level = Some("debug".to_string());
        }
        // An explicit level wins over --verbose.
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_scratch_overrides(&mut self, overrides: &ScratchOverrides) {
        if let Some(dir) = overrides.work_dir.as_ref() {
            self.scratch.work_dir = Some(dir.clone());
        }
        if overrides.keep_artifacts {
            self.scratch.keep_artifacts = Some(true);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            pool,
            geometry,
            tools,
            scratch,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            pool: build_pool_settings(pool)?,
            geometry: build_geometry_settings(geometry)?,
            tools: build_tool_settings(tools)?,
            scratch: build_scratch_settings(scratch)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_pool_settings(pool: RawPoolSettings) -> Result<PoolSettings, LoadError> {
    let threads = non_zero_u32(pool.threads.unwrap_or(DEFAULT_THREADS), "pool.threads")?;
    let units_per_thread = non_zero_u32(
        pool.units_per_thread.unwrap_or(DEFAULT_UNITS_PER_THREAD),
        "pool.units_per_thread",
    )?;
    threads.checked_mul(units_per_thread).ok_or_else(|| {
        LoadError::invalid(
            "pool.units_per_thread",
            "threads × units per thread exceeds supported range for u32",
        )
    })?;

    Ok(PoolSettings {
        threads,
        units_per_thread,
    })
}

fn build_geometry_settings(geometry: RawGeometrySettings) -> Result<GeometrySettings, LoadError> {
    let region = geometry
        .region
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.parse::<Region>())
        .transpose()
        .map_err(|reason| LoadError::invalid("geometry.region", reason))?;

    let target_width = positive(geometry.width, "geometry.width")?;
    let target_height = positive(geometry.height, "geometry.height")?;

    let split_mode = match geometry.split_mode {
        Some(mode) => mode
            .parse::<SplitMode>()
            .map_err(|reason| LoadError::invalid("geometry.split_mode", reason))?,
        None => SplitMode::Proportional,
    };

    Ok(GeometrySettings {
        region,
        target_width,
        target_height,
        split_mode,
    })
}

fn build_tool_settings(tools: RawToolSettings) -> Result<ToolSettings, LoadError> {
    let rasterizer = tool_path(tools.rasterizer, DEFAULT_RASTERIZER, "tools.rasterizer")?;
    let stitcher = tool_path(tools.stitcher, DEFAULT_STITCHER, "tools.stitcher")?;
    let probe = tool_path(tools.probe, DEFAULT_PROBE, "tools.probe")?;

    let tile_format = tools
        .tile_format
        .map(|format| format.trim().trim_start_matches('.').to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_TILE_EXTENSION.to_string());
    if tile_format.is_empty() || !tile_format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LoadError::invalid(
            "tools.tile_format",
            "must be a non-empty alphanumeric file extension",
        ));
    }

    Ok(ToolSettings {
        rasterizer,
        stitcher,
        probe,
        tile_format,
    })
}

fn build_scratch_settings(scratch: RawScratchSettings) -> Result<ScratchSettings, LoadError> {
    let work_dir = scratch
        .work_dir
        .filter(|dir| !dir.as_os_str().is_empty());

    Ok(ScratchSettings {
        work_dir,
        keep_artifacts: scratch.keep_artifacts.unwrap_or(false),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPoolSettings {
    threads: Option<u32>,
    units_per_thread: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGeometrySettings {
    region: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    split_mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawToolSettings {
    rasterizer: Option<PathBuf>,
    stitcher: Option<PathBuf>,
    probe: Option<PathBuf>,
    tile_format: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawScratchSettings {
    work_dir: Option<PathBuf>,
    keep_artifacts: Option<bool>,
}

fn non_zero_u32(value: u32, key: &'static str) -> Result<NonZeroU32, LoadError> {
    NonZeroU32::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn positive(value: Option<i64>, key: &'static str) -> Result<Option<i64>, LoadError> {
    match value {
        Some(value) if value <= 0 => Err(LoadError::invalid(key, "must be greater than zero")),
        other => Ok(other),
    }
}

fn tool_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}
