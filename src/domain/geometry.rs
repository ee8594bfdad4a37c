//! Strip geometry: how one coordinate space is cut into `unit_count` bands.
//!
//! Every unit except the last shares the same height; the last one absorbs
//! whatever the integer division left over, so the heights always add up to
//! the full extent of the space.

use serde::Serialize;

use super::error::{ConfigError, Space};

/// Derived split constants for a single coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpaceSplit {
    origin: i64,
    extent: i64,
    unit_count: usize,
    unit_height: i64,
    final_unit_height: i64,
}

impl SpaceSplit {
    /// Split the band `[origin, total)` into `unit_count` units.
    pub fn new(
        space: Space,
        origin: i64,
        total: i64,
        unit_count: usize,
    ) -> Result<Self, ConfigError> {
        if unit_count == 0 {
            return Err(ConfigError::ZeroUnits);
        }
        let count = i64::try_from(unit_count)
            .map_err(|_| ConfigError::TooManyUnits { units: unit_count })?;

        let extent = total
            .checked_sub(origin)
            .ok_or(ConfigError::ExtentOverflow {
                space,
                axis: "vertical",
                start: origin,
                end: total,
            })?;
        if extent <= 0 {
            return Err(ConfigError::EmptyExtent {
                space,
                axis: "vertical",
                start: origin,
                end: total,
            });
        }

        let unit_height = extent / count;
        if unit_height <= 0 {
            return Err(ConfigError::UnitTooSmall {
                space,
                extent,
                units: unit_count,
            });
        }
        let final_unit_height = extent - unit_height * (count - 1);

        Ok(Self {
            origin,
            extent,
            unit_count,
            unit_height,
            final_unit_height,
        })
    }

    pub fn origin(&self) -> i64 {
        self.origin
    }

    pub fn extent(&self) -> i64 {
        self.extent
    }

    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    /// Height shared by every unit but the last.
    pub fn unit_height(&self) -> i64 {
        self.unit_height
    }

    pub fn final_unit_height(&self) -> i64 {
        self.final_unit_height
    }

    /// Height of unit `index`. Indices past the end are clamped to the last unit.
    pub fn height_of(&self, index: usize) -> i64 {
        if index + 1 >= self.unit_count {
            self.final_unit_height
        } else {
            self.unit_height
        }
    }

    /// Start offset of unit `index`, in absolute coordinates of this space.
    pub fn start_of(&self, index: usize) -> i64 {
        self.origin + self.unit_height * index as i64
    }

    /// Absolute end offset of unit `index` (exclusive).
    pub fn end_of(&self, index: usize) -> i64 {
        self.start_of(index) + self.height_of(index)
    }
}

/// How target-space unit heights relate to the source split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Each target unit covers the same fraction of the output as its source
    /// unit covers of the document. Boundaries are rounded cumulatively.
    Proportional,
    /// The target space is split on its own, exactly like the source space.
    Independent,
}

impl SplitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMode::Proportional => "proportional",
            SplitMode::Independent => "independent",
        }
    }
}

impl std::str::FromStr for SplitMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "proportional" => Ok(SplitMode::Proportional),
            "independent" => Ok(SplitMode::Independent),
            other => Err(format!(
                "unknown split mode `{other}` (expected `proportional` or `independent`)"
            )),
        }
    }
}

/// Target-space split, resolved against the source split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSplit {
    Independent(SpaceSplit),
    Proportional { source: SpaceSplit, height: i64 },
}

impl TargetSplit {
    pub fn new(mode: SplitMode, source: SpaceSplit, height: i64) -> Result<Self, ConfigError> {
        match mode {
            SplitMode::Independent => Ok(Self::Independent(SpaceSplit::new(
                Space::Target,
                0,
                height,
                source.unit_count(),
            )?)),
            SplitMode::Proportional => {
                if height <= 0 {
                    return Err(ConfigError::EmptyExtent {
                        space: Space::Target,
                        axis: "vertical",
                        start: 0,
                        end: height,
                    });
                }
                let split = Self::Proportional { source, height };
                for unit in 0..source.unit_count() {
                    let unit_height = split.height_of(unit);
                    if unit_height <= 0 {
                        return Err(ConfigError::EmptyTargetUnit {
                            unit,
                            height: unit_height,
                        });
                    }
                }
                Ok(split)
            }
        }
    }

    /// Pixel offset of the top edge of unit `index`.
    pub fn offset_of(&self, index: usize) -> i64 {
        match self {
            Self::Independent(split) => split.start_of(index),
            Self::Proportional { source, height } => boundary(source, *height, index),
        }
    }

    pub fn height_of(&self, index: usize) -> i64 {
        match self {
            Self::Independent(split) => split.height_of(index),
            Self::Proportional { source, height } => {
                boundary(source, *height, index + 1) - boundary(source, *height, index)
            }
        }
    }
}

/// Rounded target row that corresponds to the start of source unit `index`.
/// `index == unit_count` maps to the bottom edge of the output.
fn boundary(source: &SpaceSplit, height: i64, index: usize) -> i64 {
    if index >= source.unit_count() {
        return height;
    }
    let relative = i128::from(source.start_of(index) - source.origin());
    let extent = i128::from(source.extent());
    let scaled = (2 * relative * i128::from(height) + extent) / (2 * extent);
    // relative < extent, so the result is below `height` and fits.
    scaled as i64
}

/// Rectangle in document coordinates, `(x0, y0)` inclusive to `(x1, y1)` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceRect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl SourceRect {
    pub fn width(&self) -> i64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i64 {
        self.y1 - self.y0
    }
}

/// Pixel slice of the final image covered by one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetSlice {
    pub width: i64,
    pub height: i64,
    pub y_offset: i64,
}

/// Everything a worker needs to know about one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitGeometry {
    pub index: usize,
    pub source: SourceRect,
    pub target: TargetSlice,
}
