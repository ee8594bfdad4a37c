use std::{fmt, str::FromStr};

use serde::Serialize;

use super::{
    error::{ConfigError, Space},
    geometry::{SourceRect, SpaceSplit, SplitMode, TargetSlice, TargetSplit, UnitGeometry},
};

/// Area of the source document to render, in document units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl Region {
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Horizontal extent; saturates for regions that fail [`Region::validate`].
    pub fn width(&self) -> i64 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> i64 {
        self.y1.saturating_sub(self.y0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_extent("horizontal", self.x0, self.x1)?;
        check_extent("vertical", self.y0, self.y1)?;
        Ok(())
    }
}

fn check_extent(axis: &'static str, start: i64, end: i64) -> Result<i64, ConfigError> {
    match end.checked_sub(start) {
        None => Err(ConfigError::ExtentOverflow {
            space: Space::Source,
            axis,
            start,
            end,
        }),
        Some(extent) if extent <= 0 => Err(ConfigError::EmptyExtent {
            space: Space::Source,
            axis,
            start,
            end,
        }),
        Some(extent) => Ok(extent),
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Parses the `x0:y0:x1:y1` notation used on the command line.
impl FromStr for Region {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split(':').map(str::trim).collect();
        let [x0, y0, x1, y1] = parts.as_slice() else {
            return Err(format!("expected `x0:y0:x1:y1`, got `{value}`"));
        };
        let parse = |raw: &str| {
            raw.parse::<i64>()
                .map_err(|err| format!("invalid coordinate `{raw}`: {err}"))
        };
        Ok(Self::new(parse(x0)?, parse(y0)?, parse(x1)?, parse(y1)?))
    }
}

/// Pixel size of the final stitched image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetSize {
    pub width: i64,
    pub height: i64,
}

impl TargetSize {
    /// Fill in missing target dimensions from the source region.
    ///
    /// With neither dimension given the output is rendered at one pixel per
    /// document unit. With one given, the other keeps the region's aspect ratio.
    pub fn resolve(
        width: Option<i64>,
        height: Option<i64>,
        region: &Region,
    ) -> Result<Self, ConfigError> {
        region.validate()?;
        let size = match (width, height) {
            (Some(width), Some(height)) => Self { width, height },
            (Some(width), None) => Self {
                width,
                height: scale(width, region.height(), region.width()),
            },
            (None, Some(height)) => Self {
                width: scale(height, region.width(), region.height()),
                height,
            },
            (None, None) => Self {
                width: region.width(),
                height: region.height(),
            },
        };
        if size.width <= 0 {
            return Err(ConfigError::EmptyExtent {
                space: Space::Target,
                axis: "horizontal",
                start: 0,
                end: size.width,
            });
        }
        if size.height <= 0 {
            return Err(ConfigError::EmptyExtent {
                space: Space::Target,
                axis: "vertical",
                start: 0,
                end: size.height,
            });
        }
        Ok(size)
    }
}

fn scale(value: i64, numerator: i64, denominator: i64) -> i64 {
    let scaled = (2 * i128::from(value) * i128::from(numerator) + i128::from(denominator))
        / (2 * i128::from(denominator));
    i64::try_from(scaled).unwrap_or(i64::MAX)
}

/// Immutable description of one strip-rendering job.
#[derive(Debug, Clone)]
pub struct RenderJob {
    region: Region,
    target: TargetSize,
    mode: SplitMode,
    source_split: SpaceSplit,
    target_split: TargetSplit,
}

impl RenderJob {
    pub fn new(
        region: Region,
        target: TargetSize,
        unit_count: usize,
        mode: SplitMode,
    ) -> Result<Self, ConfigError> {
        if unit_count == 0 {
            return Err(ConfigError::ZeroUnits);
        }
        region.validate()?;
        if target.width <= 0 {
            return Err(ConfigError::EmptyExtent {
                space: Space::Target,
                axis: "horizontal",
                start: 0,
                end: target.width,
            });
        }

        let source_split = SpaceSplit::new(Space::Source, region.y0, region.y1, unit_count)?;
        let target_split = TargetSplit::new(mode, source_split, target.height)?;

        Ok(Self {
            region,
            target,
            mode,
            source_split,
            target_split,
        })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn target(&self) -> &TargetSize {
        &self.target
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    pub fn unit_count(&self) -> usize {
        self.source_split.unit_count()
    }

    pub fn source_split(&self) -> &SpaceSplit {
        &self.source_split
    }

    /// Geometry of unit `index`, or `None` past the last unit.
    pub fn unit(&self, index: usize) -> Option<UnitGeometry> {
        if index >= self.unit_count() {
            return None;
        }
        Some(UnitGeometry {
            index,
            source: SourceRect {
                x0: self.region.x0,
                y0: self.source_split.start_of(index),
                x1: self.region.x1,
                y1: self.source_split.end_of(index),
            },
            target: TargetSlice {
                width: self.target.width,
                height: self.target_split.height_of(index),
                y_offset: self.target_split.offset_of(index),
            },
        })
    }

    pub fn units(&self) -> impl Iterator<Item = UnitGeometry> + '_ {
        (0..self.unit_count()).filter_map(|index| self.unit(index))
    }
}
