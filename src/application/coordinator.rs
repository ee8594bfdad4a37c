//! Pool coordinator: owns a job's queue, runs the fixed worker pool, and
//! stitches the artifacts once every worker has been joined.
//!
//! Tiles are always handed to the stitcher in ascending unit index. The order
//! in which workers happen to finish has no bearing on the output.

use std::{
    any::Any,
    fs, io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use serde::Serialize;
use tempfile::TempDir;
use tracing::{error, info, warn};

use crate::domain::RenderJob;

use super::{
    board::{UnitBoard, UnitState},
    error::{JobError, ThreadError},
    queue::WorkQueue,
    tools::{Rasterizer, Stitcher, ToolError},
    worker::{WorkerContext, WorkerOutcome, artifact_path, run_worker},
};

pub const DEFAULT_TILE_EXTENSION: &str = "png";

/// Knobs for how a job is dispatched, independent of its geometry.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub threads: NonZeroUsize,
    /// Parent directory for the per-job scratch directory; system temp if unset.
    pub scratch_root: Option<PathBuf>,
    pub keep_artifacts: bool,
    pub tile_extension: String,
}

impl DispatchOptions {
    pub fn new(threads: NonZeroUsize) -> Self {
        Self {
            threads,
            scratch_root: None,
            keep_artifacts: false,
            tile_extension: DEFAULT_TILE_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Configuring,
    Dispatching,
    AwaitingWorkers,
    Stitching,
    Complete,
    Failed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Configuring => "configuring",
            JobPhase::Dispatching => "dispatching",
            JobPhase::AwaitingWorkers => "awaiting_workers",
            JobPhase::Stitching => "stitching",
            JobPhase::Complete => "complete",
            JobPhase::Failed => "failed",
        }
    }
}

/// Summary of a completed job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub output: PathBuf,
    pub phase: JobPhase,
    pub units: Vec<UnitState>,
    /// Units rendered by each worker, indexed by worker number.
    pub claims_per_worker: Vec<usize>,
    /// Scratch directory left in place when artifacts were kept.
    pub kept_artifacts: Option<PathBuf>,
    pub elapsed: Duration,
}

pub struct PoolCoordinator<'a> {
    job: &'a RenderJob,
    options: &'a DispatchOptions,
    rasterizer: &'a dyn Rasterizer,
    stitcher: &'a dyn Stitcher,
}

impl<'a> PoolCoordinator<'a> {
    pub fn new(
        job: &'a RenderJob,
        options: &'a DispatchOptions,
        rasterizer: &'a dyn Rasterizer,
        stitcher: &'a dyn Stitcher,
    ) -> Self {
        Self {
            job,
            options,
            rasterizer,
            stitcher,
        }
    }

    /// Render every unit and stitch the result into `output`.
    ///
    /// On failure nothing is written to `output` and the scratch directory is
    /// left behind for inspection.
    pub fn run(&self, output: &Path) -> Result<JobReport, JobError> {
        let mut phase = PhaseTracker::new();
        let result = self.execute(&mut phase, output);
        if let Err(err) = &result {
            phase.fail(err);
        }
        result
    }

    fn execute(&self, phase: &mut PhaseTracker, output: &Path) -> Result<JobReport, JobError> {
        let unit_count = self.job.unit_count();
        let scratch = self.scratch_dir().map_err(JobError::Scratch)?;
        info!(
            target = "application::coordinator",
            op = "coordinator::run",
            units = unit_count,
            threads = self.options.threads.get(),
            split_mode = self.job.mode().as_str(),
            region = %self.job.region(),
            target_width = self.job.target().width,
            target_height = self.job.target().height,
            scratch_dir = %scratch.path().display(),
            "Starting strip render"
        );

        let queue = WorkQueue::new(unit_count);
        let board = UnitBoard::new(unit_count);
        let ctx = WorkerContext {
            job: self.job,
            queue: &queue,
            board: &board,
            rasterizer: self.rasterizer,
            scratch_dir: scratch.path(),
            extension: &self.options.tile_extension,
        };

        phase.enter(JobPhase::Dispatching);
        let outcomes = match self.dispatch(&ctx, phase) {
            Ok(outcomes) => outcomes,
            Err(err) => return Err(retain(scratch, err.into())),
        };

        let mut claims_per_worker = vec![0; self.options.threads.get()];
        let mut failure: Option<(usize, ToolError)> = None;
        for outcome in outcomes {
            claims_per_worker[outcome.worker] = outcome.rendered.len();
            if let Some((unit, err)) = outcome.failure {
                // Several workers may fail before the abort is observed; report the topmost unit.
                if failure.as_ref().is_none_or(|(first, _)| unit < *first) {
                    failure = Some((unit, err));
                }
            }
        }
        if let Some((unit, source)) = failure {
            return Err(retain(scratch, JobError::Render { unit, source }));
        }
        let unfinished = board.unfinished();
        if !unfinished.is_empty() {
            return Err(retain(scratch, JobError::Incomplete { units: unfinished }));
        }
        info!(
            target = "application::coordinator",
            op = "coordinator::run",
            units = unit_count,
            claims = ?claims_per_worker,
            elapsed_ms = phase.elapsed_ms(),
            "All units rendered"
        );

        phase.enter(JobPhase::Stitching);
        let tiles: Vec<PathBuf> = (0..unit_count)
            .map(|unit| artifact_path(scratch.path(), unit, &self.options.tile_extension))
            .collect();
        if let Err(err) = self.stitch(&tiles, output) {
            return Err(retain(scratch, err));
        }

        let kept_artifacts = if self.options.keep_artifacts {
            Some(scratch.keep())
        } else {
            remove_scratch(scratch, &tiles);
            None
        };

        phase.enter(JobPhase::Complete);
        info!(
            target = "application::coordinator",
            op = "coordinator::run",
            result = "ok",
            output = %output.display(),
            elapsed_ms = phase.elapsed_ms(),
            "Strip render complete"
        );

        Ok(JobReport {
            output: output.to_path_buf(),
            phase: JobPhase::Complete,
            units: board.snapshot(),
            claims_per_worker,
            kept_artifacts,
            elapsed: phase.elapsed(),
        })
    }

    fn scratch_dir(&self) -> io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("striprender-");
        match self.options.scratch_root.as_deref() {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
    }

    fn dispatch(
        &self,
        ctx: &WorkerContext<'_>,
        phase: &mut PhaseTracker,
    ) -> Result<Vec<WorkerOutcome>, ThreadError> {
        let threads = self.options.threads.get();
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(threads);
            let mut spawn_error = None;
            for worker in 0..threads {
                let spawned = thread::Builder::new()
                    .name(format!("striprender-worker-{worker}"))
                    .spawn_scoped(scope, move || run_worker(worker, ctx));
                match spawned {
                    Ok(handle) => handles.push((worker, handle)),
                    Err(source) => {
                        ctx.queue.abort();
                        spawn_error = Some(ThreadError::Spawn { worker, source });
                        break;
                    }
                }
            }

            phase.enter(JobPhase::AwaitingWorkers);
            let mut outcomes = Vec::with_capacity(handles.len());
            let mut join_error = None;
            for (worker, handle) in handles {
                match handle.join() {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(payload) => {
                        ctx.queue.abort();
                        join_error.get_or_insert(ThreadError::Join {
                            worker,
                            message: panic_message(payload.as_ref()),
                        });
                    }
                }
            }

            match spawn_error.or(join_error) {
                Some(err) => Err(err),
                None => Ok(outcomes),
            }
        })
    }

    /// Stitch into a hidden sibling of `output` and move it into place only
    /// once the stitcher has succeeded.
    fn stitch(&self, tiles: &[PathBuf], output: &Path) -> Result<(), JobError> {
        let publish_error = |source: io::Error| JobError::Publish {
            path: output.to_path_buf(),
            source,
        };

        let parent = output
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let suffix = output
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let staged = tempfile::Builder::new()
            .prefix(".striprender-")
            .suffix(&suffix)
            .tempfile_in(parent)
            .map_err(publish_error)?
            .into_temp_path();

        let started_at = Instant::now();
        self.stitcher
            .stitch(tiles, &staged)
            .map_err(JobError::Stitch)?;

        let written = fs::metadata(&staged).map(|meta| meta.len()).unwrap_or(0);
        if written == 0 {
            return Err(JobError::Stitch(ToolError::MissingArtifact {
                tool: "stitcher",
                path: staged.to_path_buf(),
            }));
        }

        publish_permissions(&staged, output).map_err(publish_error)?;
        staged
            .persist(output)
            .map_err(|err| publish_error(err.error))?;
        info!(
            target = "application::coordinator",
            op = "coordinator::stitch",
            result = "ok",
            tiles = tiles.len(),
            bytes = written,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            output = %output.display(),
            "Tiles stitched"
        );
        Ok(())
    }
}

struct PhaseTracker {
    current: JobPhase,
    started_at: Instant,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            current: JobPhase::Configuring,
            started_at: Instant::now(),
        }
    }

    fn enter(&mut self, next: JobPhase) {
        info!(
            target = "application::coordinator",
            op = "coordinator::phase",
            from = self.current.as_str(),
            to = next.as_str(),
            elapsed_ms = self.elapsed_ms(),
            "Job phase changed"
        );
        self.current = next;
    }

    fn fail(&mut self, err: &JobError) {
        error!(
            target = "application::coordinator",
            op = "coordinator::phase",
            from = self.current.as_str(),
            to = JobPhase::Failed.as_str(),
            stage = err.stage().as_str(),
            elapsed_ms = self.elapsed_ms(),
            error = %err,
            "Job failed"
        );
        self.current = JobPhase::Failed;
    }

    fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

/// Keep the scratch directory so partial artifacts can be inspected.
fn retain(scratch: TempDir, err: JobError) -> JobError {
    let path = scratch.keep();
    warn!(
        target = "application::coordinator",
        op = "coordinator::retain_scratch",
        scratch_dir = %path.display(),
        "Leaving intermediate artifacts in place for diagnosis"
    );
    err
}

fn remove_scratch(scratch: TempDir, tiles: &[PathBuf]) {
    for tile in tiles {
        if let Err(err) = fs::remove_file(tile) {
            warn!(
                target = "application::coordinator",
                op = "coordinator::cleanup",
                tile = %tile.display(),
                error = %err,
                "Failed to remove intermediate tile"
            );
        }
    }
    let path = scratch.path().to_path_buf();
    if let Err(err) = scratch.close() {
        warn!(
            target = "application::coordinator",
            op = "coordinator::cleanup",
            scratch_dir = %path.display(),
            error = %err,
            "Failed to remove scratch directory"
        );
    }
}

/// Give the staged image the mode of the file it replaces, or a world-readable
/// default. Tempfiles are created owner-only.
fn publish_permissions(staged: &Path, output: &Path) -> io::Result<()> {
    let permissions = match fs::metadata(output) {
        Ok(meta) => meta.permissions(),
        Err(_) => default_permissions(staged)?,
    };
    fs::set_permissions(staged, permissions)
}

#[cfg(unix)]
fn default_permissions(_staged: &Path) -> io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    Ok(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(staged: &Path) -> io::Result<fs::Permissions> {
    fs::metadata(staged).map(|meta| meta.permissions())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
