//! Raster frames and the frame source that pulls them from a composition.

pub mod raster;
pub mod source;
