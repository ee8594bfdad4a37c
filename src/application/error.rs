use std::{error::Error as StdError, fmt, io, path::PathBuf};

use thiserror::Error;

use crate::{domain::ConfigError, infra::error::InfraError};

use super::tools::ToolError;

/// Stage of a job in which a failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Dispatch,
    Stitch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Configuration => "configuration",
            Stage::Dispatch => "dispatch",
            Stage::Stitch => "stitch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn { worker: usize, source: io::Error },
    #[error("worker {worker} panicked: {message}")]
    Join { worker: usize, message: String },
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid job: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to determine document dimensions: {0}")]
    Probe(#[source] ToolError),
    #[error("failed to prepare scratch directory: {0}")]
    Scratch(#[source] io::Error),
    #[error(transparent)]
    Thread(#[from] ThreadError),
    #[error("unit {unit} failed to render: {source}")]
    Render { unit: usize, source: ToolError },
    #[error("units {units:?} never finished rendering")]
    Incomplete { units: Vec<usize> },
    #[error("stitching failed: {0}")]
    Stitch(#[source] ToolError),
    #[error("failed to write {}: {source}", .path.display())]
    Publish { path: PathBuf, source: io::Error },
}

impl JobError {
    pub fn stage(&self) -> Stage {
        match self {
            JobError::Config(_) | JobError::Probe(_) => Stage::Configuration,
            JobError::Scratch(_)
            | JobError::Thread(_)
            | JobError::Render { .. }
            | JobError::Incomplete { .. } => Stage::Dispatch,
            JobError::Stitch(_) | JobError::Publish { .. } => Stage::Stitch,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            JobError::Config(_) | JobError::Probe(_) => 2,
            JobError::Thread(_) => 3,
            JobError::Scratch(_) | JobError::Render { .. } | JobError::Incomplete { .. } => 4,
            JobError::Stitch(_) | JobError::Publish { .. } => 5,
        }
    }
}

/// Top-level failure reported by the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl AppError {
    pub fn stage(&self) -> Stage {
        match self {
            AppError::Job(err) => err.stage(),
            AppError::Infra(_) => Stage::Configuration,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Job(err) => err.exit_code(),
            AppError::Infra(InfraError::Configuration { .. }) => 2,
            AppError::Infra(_) => 1,
        }
    }
}

/// Flattened error chain, ready to be logged.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub stage: Stage,
    pub exit_code: i32,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(stage: Stage, exit_code: i32, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            stage,
            exit_code,
            messages,
        }
    }
}

impl From<&AppError> for ErrorReport {
    fn from(error: &AppError) -> Self {
        ErrorReport::from_error(error.stage(), error.exit_code(), error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_and_exit_codes_are_distinct_per_failure_class() {
        let config = JobError::from(ConfigError::ZeroUnits);
        assert_eq!(config.stage(), Stage::Configuration);
        assert_eq!(config.exit_code(), 2);

        let thread = JobError::from(ThreadError::Join {
            worker: 3,
            message: "oops".to_string(),
        });
        assert_eq!(thread.stage(), Stage::Dispatch);
        assert_eq!(thread.exit_code(), 3);

        let render = JobError::Render {
            unit: 4,
            source: ToolError::Failed {
                tool: "rasterizer",
                exit_code: Some(1),
                stderr: String::new(),
            },
        };
        assert_eq!(render.stage(), Stage::Dispatch);
        assert_eq!(render.exit_code(), 4);

        let stitch = JobError::Stitch(ToolError::output("stitcher", "empty"));
        assert_eq!(stitch.stage(), Stage::Stitch);
        assert_eq!(stitch.exit_code(), 5);
    }

    #[test]
    fn report_walks_the_source_chain() {
        let error = AppError::from(JobError::Render {
            unit: 7,
            source: ToolError::Failed {
                tool: "rasterizer",
                exit_code: Some(9),
                stderr: "bad area".to_string(),
            },
        });
        let report = ErrorReport::from(&error);
        assert_eq!(report.stage, Stage::Dispatch);
        assert_eq!(report.exit_code, 4);
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[0].contains("unit 7"));
        assert!(report.messages[1].contains("bad area"));
    }
}
