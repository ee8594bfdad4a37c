use std::fmt;

use thiserror::Error;

/// Coordinate space a unit height or extent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    Source,
    Target,
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::Source => f.write_str("source"),
            Space::Target => f.write_str("target"),
        }
    }
}

/// Fatal configuration problems detected before any unit is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unit count must be greater than zero")]
    ZeroUnits,
    #[error("unit count {units} exceeds the supported range")]
    TooManyUnits { units: usize },
    #[error("{space} {axis} extent must be positive (from {start} to {end})")]
    EmptyExtent {
        space: Space,
        axis: &'static str,
        start: i64,
        end: i64,
    },
    #[error("{space} {axis} extent from {start} to {end} exceeds the coordinate range")]
    ExtentOverflow {
        space: Space,
        axis: &'static str,
        start: i64,
        end: i64,
    },
    #[error("{space} height {extent} cannot be split into {units} units of positive height")]
    UnitTooSmall {
        space: Space,
        extent: i64,
        units: usize,
    },
    #[error("target unit {unit} would be {height} pixels tall")]
    EmptyTargetUnit { unit: usize, height: i64 },
}
