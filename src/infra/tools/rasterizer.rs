use std::{ffi::OsString, path::PathBuf};

use crate::application::{Rasterizer, TileRequest, ToolError};

use super::process::run_tool;

/// Exports one rectangle of a document per call via the Inkscape CLI.
#[derive(Debug, Clone)]
pub struct InkscapeRasterizer {
    program: PathBuf,
    input: PathBuf,
    export_type: String,
}

impl InkscapeRasterizer {
    pub fn new(
        program: impl Into<PathBuf>,
        input: impl Into<PathBuf>,
        export_type: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            input: input.into(),
            export_type: export_type.into(),
        }
    }

    fn arguments(&self, request: &TileRequest<'_>) -> Vec<OsString> {
        let area = request.source;
        let mut filename = OsString::from("--export-filename=");
        filename.push(request.artifact);
        vec![
            format!(
                "--export-area={}:{}:{}:{}",
                area.x0, area.y0, area.x1, area.y1
            )
            .into(),
            format!("--export-width={}", request.width).into(),
            format!("--export-height={}", request.height).into(),
            format!("--export-type={}", self.export_type).into(),
            filename,
            self.input.clone().into_os_string(),
        ]
    }
}

impl Rasterizer for InkscapeRasterizer {
    fn rasterize(&self, request: &TileRequest<'_>) -> Result<(), ToolError> {
        run_tool("rasterizer", &self.program, &self.arguments(request)).map(|_| ())
    }
}
