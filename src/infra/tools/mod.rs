//! Subprocess-backed collaborators.
//!
//! Defaults target Inkscape 1.x for rasterizing and probing and ImageMagick
//! for stitching. Any program honoring the same argument conventions can be
//! swapped in through configuration.

mod probe;
mod process;
mod rasterizer;
mod stitcher;

pub use probe::InkscapeProbe;
pub use rasterizer::InkscapeRasterizer;
pub use stitcher::ImageMagickStitcher;

pub const DEFAULT_RASTERIZER: &str = "inkscape";
pub const DEFAULT_STITCHER: &str = "convert";
pub const DEFAULT_PROBE: &str = "inkscape";
