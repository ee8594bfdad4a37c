//! Strip rendering: split a large document into horizontal units, rasterize
//! them on a fixed worker pool, and stitch the tiles back together in order.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
