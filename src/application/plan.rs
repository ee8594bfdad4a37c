use std::io::{self, Write};

use serde::Serialize;

use crate::domain::{Region, RenderJob, SplitMode, TargetSize, UnitGeometry};

/// Dry-run view of a job: every unit's geometry, nothing rendered.
#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    pub region: Region,
    pub target: TargetSize,
    pub split_mode: SplitMode,
    pub unit_count: usize,
    pub units: Vec<UnitGeometry>,
}

impl PlanView {
    pub fn from_job(job: &RenderJob) -> Self {
        Self {
            region: *job.region(),
            target: *job.target(),
            split_mode: job.mode(),
            unit_count: job.unit_count(),
            units: job.units().collect(),
        }
    }

    pub fn write_json(&self, out: &mut impl Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }

    pub fn write_table(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(
            out,
            "region {} -> {}x{} px, {} units ({})",
            self.region,
            self.target.width,
            self.target.height,
            self.unit_count,
            self.split_mode.as_str()
        )?;
        writeln!(
            out,
            "{:>6}  {:>10} {:>10} {:>8}  {:>8} {:>8}",
            "unit", "src_y0", "src_y1", "src_h", "dst_y", "dst_h"
        )?;
        for unit in &self.units {
            writeln!(
                out,
                "{:>6}  {:>10} {:>10} {:>8}  {:>8} {:>8}",
                unit.index,
                unit.source.y0,
                unit.source.y1,
                unit.source.height(),
                unit.target.y_offset,
                unit.target.height
            )?;
        }
        Ok(())
    }
}
