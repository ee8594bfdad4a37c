//! Domain layer: job geometry and its invariants.

pub mod error;
pub mod geometry;
pub mod job;

pub use error::{ConfigError, Space};
pub use geometry::{SourceRect, SpaceSplit, SplitMode, TargetSlice, TargetSplit, UnitGeometry};
pub use job::{Region, RenderJob, TargetSize};
