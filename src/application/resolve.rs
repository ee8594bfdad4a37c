use std::{num::NonZeroUsize, path::Path};

use tracing::info;

use crate::{
    config::Settings,
    domain::{ConfigError, Region, RenderJob, SplitMode, TargetSize},
};

use super::{coordinator::DispatchOptions, error::JobError, tools::DimensionProbe};

/// Job parameters as configured, before the document has been looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub region: Option<Region>,
    pub target_width: Option<i64>,
    pub target_height: Option<i64>,
    pub unit_count: usize,
    pub mode: SplitMode,
}

impl JobSpec {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            region: settings.geometry.region,
            target_width: settings.geometry.target_width,
            target_height: settings.geometry.target_height,
            unit_count: settings.pool.unit_count(),
            mode: settings.geometry.split_mode,
        }
    }

    /// Build the immutable job, probing `input` when no region was configured.
    pub fn resolve(
        &self,
        input: &Path,
        probe: &dyn DimensionProbe,
    ) -> Result<RenderJob, JobError> {
        if self.unit_count == 0 {
            return Err(ConfigError::ZeroUnits.into());
        }
        let region = match self.region {
            Some(region) => region,
            None => {
                let region = probe.probe(input).map_err(JobError::Probe)?;
                info!(
                    target = "application::resolve",
                    op = "resolve::probe",
                    input = %input.display(),
                    region = %region,
                    "Probed document bounds"
                );
                region
            }
        };
        let target = TargetSize::resolve(self.target_width, self.target_height, &region)?;
        Ok(RenderJob::new(region, target, self.unit_count, self.mode)?)
    }
}

impl DispatchOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let threads = NonZeroUsize::try_from(settings.pool.threads).unwrap_or(NonZeroUsize::MIN);
        Self {
            threads,
            scratch_root: settings.scratch.work_dir.clone(),
            keep_artifacts: settings.scratch.keep_artifacts,
            tile_extension: settings.tools.tile_format.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::application::tools::ToolError;

    struct FixedProbe {
        region: Option<Region>,
        calls: Cell<usize>,
    }

    impl DimensionProbe for FixedProbe {
        fn probe(&self, _input: &Path) -> Result<Region, ToolError> {
            self.calls.set(self.calls.get() + 1);
            self.region
                .ok_or_else(|| ToolError::output("probe", "no drawing"))
        }
    }

    fn spec(region: Option<Region>) -> JobSpec {
        JobSpec {
            region,
            target_width: None,
            target_height: None,
            unit_count: 4,
            mode: SplitMode::Proportional,
        }
    }

    #[test]
    fn explicit_region_skips_the_probe() {
        let probe = FixedProbe {
            region: None,
            calls: Cell::new(0),
        };
        let job = spec(Some(Region::new(0, 0, 40, 80)))
            .resolve(Path::new("doc.svg"), &probe)
            .expect("job");
        assert_eq!(probe.calls.get(), 0);
        assert_eq!(job.unit_count(), 4);
        assert_eq!(job.target().height, 80);
    }

    #[test]
    fn missing_region_is_probed() {
        let probe = FixedProbe {
            region: Some(Region::new(0, 0, 200, 100)),
            calls: Cell::new(0),
        };
        let mut spec = spec(None);
        spec.target_width = Some(400);
        let job = spec
            .resolve(Path::new("doc.svg"), &probe)
            .expect("job");
        assert_eq!(probe.calls.get(), 1);
        assert_eq!(*job.region(), Region::new(0, 0, 200, 100));
        assert_eq!(job.target().height, 200);
    }

    #[test]
    fn probe_failure_is_a_configuration_error() {
        let probe = FixedProbe {
            region: None,
            calls: Cell::new(0),
        };
        let err = spec(None)
            .resolve(Path::new("doc.svg"), &probe)
            .expect_err("probe fails");
        assert!(matches!(err, JobError::Probe(_)));
        assert_eq!(err.stage(), crate::application::error::Stage::Configuration);
    }

    #[test]
    fn zero_units_fail_before_probing() {
        let probe = FixedProbe {
            region: Some(Region::new(0, 0, 10, 10)),
            calls: Cell::new(0),
        };
        let mut spec = spec(None);
        spec.unit_count = 0;
        let err = spec
            .resolve(Path::new("doc.svg"), &probe)
            .expect_err("zero units");
        assert!(matches!(err, JobError::Config(ConfigError::ZeroUnits)));
        assert_eq!(probe.calls.get(), 0);
    }
}
