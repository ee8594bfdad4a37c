use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use tracing::{debug, warn};

use crate::domain::RenderJob;

use super::{
    board::{UnitBoard, UnitState},
    queue::WorkQueue,
    tools::{Rasterizer, TileRequest, ToolError},
};

/// Path of the artifact produced for `unit` inside `dir`.
pub fn artifact_path(dir: &Path, unit: usize, extension: &str) -> PathBuf {
    dir.join(format!("tile-{unit:05}.{extension}"))
}

/// Borrowed view of the job shared by every worker thread.
pub(crate) struct WorkerContext<'a> {
    pub job: &'a RenderJob,
    pub queue: &'a WorkQueue,
    pub board: &'a UnitBoard,
    pub rasterizer: &'a dyn Rasterizer,
    pub scratch_dir: &'a Path,
    pub extension: &'a str,
}

/// What a single worker did before it stopped claiming units.
#[derive(Debug)]
pub(crate) struct WorkerOutcome {
    pub worker: usize,
    pub rendered: Vec<usize>,
    pub failure: Option<(usize, ToolError)>,
}

/// Claim units until the queue runs dry or a render fails.
pub(crate) fn run_worker(worker: usize, ctx: &WorkerContext<'_>) -> WorkerOutcome {
    let mut outcome = WorkerOutcome {
        worker,
        rendered: Vec::new(),
        failure: None,
    };

    while let Some(unit) = ctx.queue.next() {
        ctx.board.mark(unit, UnitState::Assigned);
        let Some(geometry) = ctx.job.unit(unit) else {
            // The queue is sized from the job, so this only trips on a mismatch.
            ctx.board.mark(unit, UnitState::Failed);
            ctx.queue.abort();
            break;
        };

        let artifact = artifact_path(ctx.scratch_dir, unit, ctx.extension);
        let request = TileRequest {
            unit,
            source: geometry.source,
            width: geometry.target.width,
            height: geometry.target.height,
            artifact: &artifact,
        };

        ctx.board.mark(unit, UnitState::Rendering);
        let started_at = Instant::now();
        let result = ctx
            .rasterizer
            .rasterize(&request)
            .and_then(|()| ensure_artifact(&artifact));

        match result {
            Ok(()) => {
                ctx.board.mark(unit, UnitState::Done);
                debug!(
                    target = "application::worker",
                    op = "worker::render_unit",
                    result = "ok",
                    worker,
                    unit,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    source = ?geometry.source,
                    target_height = geometry.target.height,
                    "Unit rendered"
                );
                outcome.rendered.push(unit);
            }
            Err(err) => {
                ctx.board.mark(unit, UnitState::Failed);
                ctx.queue.abort();
                warn!(
                    target = "application::worker",
                    op = "worker::render_unit",
                    result = "error",
                    worker,
                    unit,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error = %err,
                    "Unit failed; aborting dispatch of remaining units"
                );
                outcome.failure = Some((unit, err));
                break;
            }
        }
    }

    outcome
}

fn ensure_artifact(path: &Path) -> Result<(), ToolError> {
    match path.metadata() {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(ToolError::MissingArtifact {
            tool: "rasterizer",
            path: path.to_path_buf(),
        }),
    }
}
