//! Seams to the external tools a job depends on.
//!
//! The application layer only decides which region each unit covers and in
//! which order tiles are assembled. Pixels are produced by implementations of
//! these traits; `crate::infra::tools` ships subprocess-backed ones.

use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::domain::{Region, SourceRect};

/// One rasterization request, issued once per claimed unit.
#[derive(Debug, Clone, Copy)]
pub struct TileRequest<'a> {
    pub unit: usize,
    pub source: SourceRect,
    pub width: i64,
    pub height: i64,
    pub artifact: &'a Path,
}

/// Renders a rectangle of the source document into a raster file.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, request: &TileRequest<'_>) -> Result<(), ToolError>;
}

/// Concatenates tiles top to bottom, strictly in the order given.
pub trait Stitcher: Send + Sync {
    fn stitch(&self, tiles: &[PathBuf], output: &Path) -> Result<(), ToolError>;
}

/// Reports the drawing bounds of a source document.
pub trait DimensionProbe {
    fn probe(&self, input: &Path) -> Result<Region, ToolError>;
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} unavailable: {source}")]
    NotFound {
        tool: &'static str,
        source: io::Error,
    },
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        source: io::Error,
    },
    #[error("{tool} invocation failed (exit {exit_code:?}): {stderr}")]
    Failed {
        tool: &'static str,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("{tool} produced unusable output: {reason}")]
    Output { tool: &'static str, reason: String },
    #[error("{tool} reported success but wrote nothing to {}", .path.display())]
    MissingArtifact { tool: &'static str, path: PathBuf },
}

impl ToolError {
    pub fn output(tool: &'static str, reason: impl Into<String>) -> Self {
        Self::Output {
            tool,
            reason: reason.into(),
        }
    }

    pub fn tool(&self) -> &'static str {
        match self {
            Self::NotFound { tool, .. }
            | Self::Spawn { tool, .. }
            | Self::Failed { tool, .. }
            | Self::Output { tool, .. }
            | Self::MissingArtifact { tool, .. } => tool,
        }
    }
}
