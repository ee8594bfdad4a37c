//! Application layer: the work queue, the worker loop and the pool coordinator.

pub mod board;
pub mod coordinator;
pub mod error;
pub mod plan;
pub mod queue;
pub mod resolve;
pub mod tools;
pub mod worker;

pub use board::{UnitBoard, UnitState};
pub use coordinator::{DispatchOptions, JobPhase, JobReport, PoolCoordinator};
pub use error::{AppError, ErrorReport, JobError, Stage, ThreadError};
pub use plan::PlanView;
pub use queue::WorkQueue;
pub use resolve::JobSpec;
pub use tools::{DimensionProbe, Rasterizer, Stitcher, TileRequest, ToolError};
